//! Topology from `sysctl` (macOS).
//!
//! Every key is queried on its own. A key that fails or returns something
//! that isn't an integer is skipped with a warning, so a partially
//! answered probe still yields a usable [`CacheHierarchy`].

use super::{CacheHierarchy, TopologyProbe};
use crate::error::Result;
use std::io;
use std::process::Command;

pub const KEY_CORES: &str = "hw.physicalcpu";
pub const KEY_L1D: &str = "hw.l1dcachesize";
pub const KEY_L2: &str = "hw.l2cachesize";
pub const KEY_L3: &str = "hw.l3cachesize";

/// Probe backed by a per-key query function.
///
/// [`SysctlProbe::system`] shells out to `sysctl -n <key>`; tests swap in
/// their own query with [`SysctlProbe::with_query`].
pub struct SysctlProbe<Q = fn(&str) -> io::Result<String>> {
    query: Q,
}

impl SysctlProbe {
    pub fn system() -> Self {
        Self { query: run_sysctl }
    }
}

impl<Q> SysctlProbe<Q>
where
    Q: Fn(&str) -> io::Result<String>,
{
    pub fn with_query(query: Q) -> Self {
        Self { query }
    }

    /// Query one key. `None` means "unknown", already reported.
    fn read_key(&self, key: &str) -> Option<u64> {
        let raw = match (self.query)(key) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("sysctl query for '{}' failed: {}", key, e);
                return None;
            }
        };

        match raw.trim().parse::<u64>() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("value of '{}' isn't an integer: {:?}", key, raw.trim());
                None
            }
        }
    }
}

impl<Q> TopologyProbe for SysctlProbe<Q>
where
    Q: Fn(&str) -> io::Result<String>,
{
    fn probe(&self) -> Result<CacheHierarchy> {
        let mut info = CacheHierarchy::default();

        for key in [KEY_CORES, KEY_L1D, KEY_L2, KEY_L3] {
            let Some(value) = self.read_key(key) else {
                continue;
            };
            match key {
                KEY_CORES => info.logical_cores = value as usize,
                KEY_L1D => info.l1d_cache = value,
                KEY_L2 => info.l2_cache = value,
                _ => info.l3_cache = value,
            }
        }

        Ok(info)
    }
}

fn run_sysctl(key: &str) -> io::Result<String> {
    let output = Command::new("sysctl").arg("-n").arg(key).output()?;
    if !output.status.success() {
        return Err(io::Error::other(format!(
            "sysctl exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
