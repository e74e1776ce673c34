//! Topology from the `lscpu` listing (Linux).
//!
//! `lscpu` prints one `Label: value` pair per line. Depending on the
//! util-linux version cache lines look like any of:
//!
//! ```text
//! L1d cache:                       32K
//! L2 cache:                        1.5 MiB
//! L3:                              32 MiB (1 instance)
//! ```

use super::{CacheHierarchy, TopologyProbe};
use crate::error::{Error, Result};
use std::process::Command;

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Runs `lscpu` once and parses its output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LscpuProbe;

impl TopologyProbe for LscpuProbe {
    fn probe(&self) -> Result<CacheHierarchy> {
        let output = Command::new("lscpu")
            .output()
            .map_err(|source| Error::ProbeCommand {
                command: "lscpu".to_string(),
                source,
            })?;

        if !output.status.success() {
            log::warn!("lscpu exited with {}", output.status);
        }

        parse_lscpu(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extract core count and cache sizes from `lscpu` text.
///
/// Unknown lines are ignored. Missing fields stay at 0.
///
/// # Errors
///
/// A recognised field whose value is not a number is
/// [`Error::MalformedTopology`]; the block size can't be trusted then.
pub fn parse_lscpu(text: &str) -> Result<CacheHierarchy> {
    let mut info = CacheHierarchy::default();

    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };

        match label.trim() {
            // "NUMA node0 CPU(s)" and "On-line CPU(s) list" never match exactly
            "CPU(s)" => {
                let count = value.trim();
                info.logical_cores = count.parse().map_err(|_| malformed("CPU(s)", count))?;
            }
            "L1d cache" | "L1d" => info.l1d_cache = parse_cache_value("L1d", value)?,
            "L2 cache" | "L2" => info.l2_cache = parse_cache_value("L2", value)?,
            "L3 cache" | "L3" => info.l3_cache = parse_cache_value("L3", value)?,
            _ => {}
        }
    }

    Ok(info)
}

/// Convert a size and unit token to bytes.
///
/// Only the first letter of the unit counts, case-insensitively:
/// `K` = 1024, `M` = 1024², `G` = 1024³, `B` or nothing = bytes.
/// So `MiB`, `MB` and `M` all mean the same thing. Fractional sizes are
/// truncated after scaling.
///
/// # Errors
///
/// Returns [`Error::MalformedTopology`] if `size` is not a non-negative number.
pub fn parse_size(size: &str, unit: &str) -> Result<u64> {
    let value: f64 = size.parse().map_err(|_| malformed("size", size))?;
    if !value.is_finite() || value < 0.0 {
        return Err(malformed("size", size));
    }

    let multiplier = match unit.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('K') => KIB,
        Some('M') => MIB,
        Some('G') => GIB,
        _ => 1.0,
    };

    Ok((value * multiplier) as u64)
}

/// Parse the value part of a cache line: `"1.5 MiB (2 instances)"` or `"32K"`.
fn parse_cache_value(field: &str, value: &str) -> Result<u64> {
    let mut tokens = value.split_whitespace();
    let Some(first) = tokens.next() else {
        return Ok(0);
    };

    // older lscpu glues the unit to the number
    let split = first
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(first.len());
    let (size, glued_unit) = first.split_at(split);

    let unit = if glued_unit.is_empty() {
        tokens.next().filter(|t| !t.starts_with('(')).unwrap_or("")
    } else {
        glued_unit
    };

    parse_size(size, unit).map_err(|_| malformed(field, value.trim()))
}

fn malformed(field: &str, value: &str) -> Error {
    Error::MalformedTopology {
        field: field.to_string(),
        value: value.to_string(),
    }
}
