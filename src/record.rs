//! Benchmark result records as written by the norm executable.
//!
//! Each invocation of the executable appends one record per matrix size to
//! the sweep's result file. The key names below are the on-disk schema and
//! must not change.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Which implementation of the executable a record (or sweep) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Implementation {
    Serial,
    Threaded,
}

impl Implementation {
    /// Value passed to `--impl` and stored in `metadata.implementation`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Threaded => "threaded",
        }
    }

    /// File name of this variant's results inside an output directory.
    pub fn results_file(self) -> &'static str {
        match self {
            Self::Serial => "serial.yaml",
            Self::Threaded => "threaded.yaml",
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (implementation, matrix size) measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub metadata: Metadata,
    #[serde(rename = "statistics")]
    pub stats: Statistics,
    pub individual_runs: Vec<IndividualRun>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub implementation: Implementation,
    pub matrix_size: usize,
    pub block_size: usize,
    pub num_threads: usize,
    pub num_repeats: usize,
    /// Unix seconds at which the executable wrote the record.
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub multiplication: TimingStats,
    pub norm_computation: TimingStats,
    pub total: TimingStats,
}

/// Wall times in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub average_time: f64,
    pub min_time: f64,
    pub max_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualRun {
    pub run: usize,
    pub multiplication_time: f64,
    pub norm_time: f64,
    pub total_time: f64,
}

/// The executable wraps every record it prints in this key.
#[derive(Deserialize)]
struct Envelope {
    benchmark_results: BenchmarkRecord,
}

const ENVELOPE_KEY: &str = "benchmark_results:";

/// Read every record from a result file.
///
/// # Errors
///
/// [`Error::Io`] if the file can't be read, [`Error::Parse`] if it isn't
/// benchmark YAML.
pub fn read_records(path: &Path) -> Result<Vec<BenchmarkRecord>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_records(&text).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse result text.
///
/// Two layouts are accepted: a plain YAML sequence of records, and the
/// concatenation of `benchmark_results:` blocks produced by appending one
/// executable invocation after another. An empty file holds no records.
pub fn parse_records(text: &str) -> std::result::Result<Vec<BenchmarkRecord>, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let sequence_err = match serde_yaml::from_str::<Vec<BenchmarkRecord>>(text) {
        Ok(records) => return Ok(records),
        Err(e) => e,
    };

    let (prefix, blocks) = split_envelopes(text);
    if blocks.is_empty() {
        return Err(sequence_err);
    }
    if let Some(line) = prefix.lines().find(|l| !l.trim().is_empty()) {
        return Err(serde::de::Error::custom(format!(
            "unexpected text before the first `{}` block: {:?}",
            ENVELOPE_KEY.trim_end_matches(':'),
            line
        )));
    }

    blocks
        .iter()
        .map(|block| serde_yaml::from_str::<Envelope>(block).map(|e| e.benchmark_results))
        .collect()
}

/// Cut text into chunks that each start with a top-level `benchmark_results:` line.
///
/// Whatever precedes the first such line is returned separately.
fn split_envelopes(text: &str) -> (&str, Vec<String>) {
    let mut prefix = text;
    let mut blocks: Vec<String> = Vec::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if line.starts_with(ENVELOPE_KEY) {
            if blocks.is_empty() {
                prefix = &text[..offset];
            }
            blocks.push(String::new());
        }
        if let Some(block) = blocks.last_mut() {
            block.push_str(line);
        }
        offset += line.len();
    }

    (prefix, blocks)
}
