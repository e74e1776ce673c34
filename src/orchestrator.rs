//! Runs the serial and threaded sweeps side by side.
//!
//! Each sweep gets its own thread, its own config copy, and its own output
//! file, so nothing mutable is shared. Completion is a fan-in over a
//! channel: the caller waits for as many reports as units it launched.

use crate::error::{Error, Result};
use crate::record::Implementation;
use crate::sweep::{NormSweep, SweepConfig, SweepReport, SweepUnit};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

/// Parameters of one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkPlan {
    pub block_size: usize,
    /// Thread count for the threaded variant; serial always uses 1.
    pub threads: usize,
    pub repeats: usize,
    pub exec_path: PathBuf,
    pub output_dir: PathBuf,
}

impl BenchmarkPlan {
    fn sweep_config(&self, implementation: Implementation) -> SweepConfig {
        let threads = match implementation {
            Implementation::Serial => 1,
            Implementation::Threaded => self.threads,
        };
        SweepConfig {
            implementation,
            block_size: self.block_size,
            threads,
            repeats: self.repeats,
            exec_path: self.exec_path.clone(),
        }
    }
}

/// Open a fresh, empty output file for a sweep.
///
/// Parent directories are created, old content is discarded, and the file
/// is returned in append mode so every child process adds to the end.
///
/// # Errors
///
/// [`Error::Io`] if the directory or file can't be created.
pub fn prepare_sink(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // truncate first, then reopen for appending
    File::create(path).map_err(|e| Error::io(path, e))?;
    OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))
}

/// Run every unit on its own thread and wait until all of them reported.
///
/// Reports come back in launch order regardless of which unit finished
/// first.
///
/// # Errors
///
/// [`Error::SweepAborted`] if a unit's thread ends without reporting
/// (i.e. it panicked).
pub fn run_concurrently(units: Vec<Box<dyn SweepUnit>>) -> Result<Vec<SweepReport>> {
    let expected = units.len();
    let labels: Vec<String> = units.iter().map(|u| u.label()).collect();
    let (tx, rx) = mpsc::channel::<(usize, SweepReport)>();

    let handles: Vec<_> = units
        .into_iter()
        .enumerate()
        .map(|(index, unit)| {
            let tx = tx.clone();
            thread::spawn(move || {
                let report = unit.run();
                // receiver only goes away once the orchestrator gave up
                let _ = tx.send((index, report));
            })
        })
        .collect();
    drop(tx);

    let mut reports: Vec<Option<SweepReport>> = vec![None; expected];
    for _ in 0..expected {
        match rx.recv() {
            Ok((index, report)) => {
                log::debug!("sweep '{}' signalled completion", labels[index]);
                reports[index] = Some(report);
            }
            // every sender dropped early: some unit died without reporting
            Err(_) => break,
        }
    }

    for handle in handles {
        let _ = handle.join();
    }

    reports
        .into_iter()
        .zip(labels)
        .map(|(report, label)| report.ok_or(Error::SweepAborted(label)))
        .collect()
}

/// Benchmark both implementations over the full size sweep.
///
/// Writes `serial.yaml` and `threaded.yaml` into `plan.output_dir` and
/// returns only after both sweeps are done, so the files are complete when
/// this returns.
///
/// # Errors
///
/// Fails if the output files can't be prepared or a sweep thread dies.
/// Failing executable runs are not errors; see [`SweepReport::failed`].
pub fn benchmark(plan: &BenchmarkPlan) -> Result<Vec<SweepReport>> {
    let mut units: Vec<Box<dyn SweepUnit>> = Vec::new();

    for implementation in [Implementation::Serial, Implementation::Threaded] {
        let path = plan.output_dir.join(implementation.results_file());
        let sink = prepare_sink(&path)?;
        log::info!("{} results -> {}", implementation, path.display());
        units.push(Box::new(NormSweep::new(
            plan.sweep_config(implementation),
            sink,
        )));
    }

    run_concurrently(units)
}
