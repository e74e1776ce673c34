//! Hardware topology probing and cache-aware block sizing.
//!
//! Each supported platform gets its own [`TopologyProbe`]:
//! - `lscpu`: Linux, parses the text listing from a single command
//! - `sysctl`: macOS, one isolated query per hardware key
//!
//! [`platform_probe`] picks the right one once at startup.

pub mod lscpu;
pub mod sysctl;

use crate::error::{Error, Result};

pub use lscpu::LscpuProbe;
pub use sysctl::SysctlProbe;

/// Block size used when no cache size could be probed.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Three `f64` blocks (A, B and C tiles) resident at the same time.
const BYTES_PER_BLOCK_ELEMENT: u64 = 3 * 8;

/// Core count and data cache sizes of the host. Sizes are in bytes, 0 means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheHierarchy {
    pub logical_cores: usize,
    pub l1d_cache: u64,
    pub l2_cache: u64,
    pub l3_cache: u64,
}

impl CacheHierarchy {
    /// Largest cache level that was detected, or 0.
    pub fn largest_cache(&self) -> u64 {
        self.l3_cache.max(self.l2_cache).max(self.l1d_cache)
    }

    /// Threads to hand the threaded implementation. Never 0.
    pub fn thread_count(&self) -> usize {
        if self.logical_cores > 0 {
            return self.logical_cores;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Something that can describe the cache hierarchy of the current machine.
pub trait TopologyProbe {
    fn probe(&self) -> Result<CacheHierarchy>;
}

/// Pick the probe for the OS this binary was built for.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPlatform`] on anything but Linux and macOS.
pub fn platform_probe() -> Result<Box<dyn TopologyProbe>> {
    probe_for_os(std::env::consts::OS)
}

fn probe_for_os(os: &str) -> Result<Box<dyn TopologyProbe>> {
    match os {
        "linux" => Ok(Box::new(LscpuProbe)),
        "macos" => Ok(Box::new(SysctlProbe::system())),
        other => Err(Error::UnsupportedPlatform(other.to_string())),
    }
}

/// Block edge length that keeps three blocks inside the largest cache.
///
/// With `c = max(L3, L2, L1d)` this is `floor(sqrt(c / 24))`: three square
/// blocks of 8-byte elements. It's a heuristic and nothing more; the
/// executable under test is free to perform better with other sizes.
/// Falls back to [`DEFAULT_BLOCK_SIZE`] when no cache size is known.
pub fn optimal_block_size(hierarchy: &CacheHierarchy) -> usize {
    let cache = hierarchy.largest_cache();
    if cache == 0 {
        return DEFAULT_BLOCK_SIZE;
    }

    let squared = cache as f64 / BYTES_PER_BLOCK_ELEMENT as f64;
    (squared.sqrt() as usize).max(1)
}
