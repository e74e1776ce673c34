//! A full matrix-size sweep for one implementation.
//!
//! A sweep is the unit of concurrent work: it owns its configuration and its
//! output file, runs every size in ascending order, and signals completion
//! by returning a [`SweepReport`].

use crate::record::Implementation;
use crate::runner::{NormCommand, RunOutcome};
use std::fs::File;
use std::path::PathBuf;

pub const MATRIX_SIZE_START: usize = 1024;
pub const MATRIX_SIZE_STEP: usize = 512;
/// Inclusive.
pub const MATRIX_SIZE_END: usize = 4096;

/// Matrix sizes benchmarked by every sweep, smallest first.
pub fn matrix_sizes() -> impl Iterator<Item = usize> {
    (MATRIX_SIZE_START..=MATRIX_SIZE_END).step_by(MATRIX_SIZE_STEP)
}

/// Largest power of two no greater than `block_size`, capped at
/// [`MATRIX_SIZE_STEP`].
///
/// The executable rejects a matrix size its block size does not divide, and
/// every swept size is a multiple of the step.
pub fn fit_block_size(block_size: usize) -> usize {
    let capped = block_size.clamp(1, MATRIX_SIZE_STEP);
    1 << capped.ilog2()
}

/// Whether `block_size` divides every swept matrix size.
pub fn divides_sweep(block_size: usize) -> bool {
    block_size > 0 && matrix_sizes().all(|size| size % block_size == 0)
}

/// Everything one sweep needs, owned by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    pub implementation: Implementation,
    pub block_size: usize,
    pub threads: usize,
    pub repeats: usize,
    pub exec_path: PathBuf,
}

/// What a sweep did. Failed sizes have no record in the result file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub label: String,
    pub completed: Vec<usize>,
    pub failed: Vec<usize>,
}

/// An independently scheduled piece of work that reports back exactly once.
pub trait SweepUnit: Send {
    fn label(&self) -> String;

    fn run(self: Box<Self>) -> SweepReport;
}

/// Sweep that drives the real executable.
#[derive(Debug)]
pub struct NormSweep {
    config: SweepConfig,
    sink: File,
}

impl NormSweep {
    pub fn new(config: SweepConfig, sink: File) -> Self {
        Self { config, sink }
    }

    fn command(&self, matrix_size: usize) -> NormCommand {
        NormCommand {
            matrix_size,
            block_size: self.config.block_size,
            threads: self.config.threads,
            repeats: self.config.repeats,
            implementation: self.config.implementation,
        }
    }
}

impl SweepUnit for NormSweep {
    fn label(&self) -> String {
        self.config.implementation.to_string()
    }

    fn run(self: Box<Self>) -> SweepReport {
        let mut report = SweepReport {
            label: self.label(),
            ..SweepReport::default()
        };

        for size in matrix_sizes() {
            match self.command(size).run(&self.config.exec_path, &self.sink) {
                RunOutcome::Succeeded => report.completed.push(size),
                RunOutcome::Failed(status) => {
                    log::warn!("{} n={}: executable exited with {}", report.label, size, status);
                    report.failed.push(size);
                }
                RunOutcome::LaunchFailed(e) => {
                    log::warn!(
                        "{} n={}: could not launch {}: {}",
                        report.label,
                        size,
                        self.config.exec_path.display(),
                        e
                    );
                    report.failed.push(size);
                }
            }
        }

        log::debug!(
            "{} sweep finished: {} ok, {} failed",
            report.label,
            report.completed.len(),
            report.failed.len()
        );
        report
    }
}
