//! One invocation of the norm executable.

use crate::record::Implementation;
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Arguments for a single run of the executable under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormCommand {
    pub matrix_size: usize,
    pub block_size: usize,
    pub threads: usize,
    pub repeats: usize,
    pub implementation: Implementation,
}

/// How an invocation ended.
///
/// None of these is an error for the caller: a sweep keeps going no matter
/// what, and a failed size simply has no record in the result file.
#[derive(Debug)]
pub enum RunOutcome {
    Succeeded,
    /// Exited non-zero or was killed by a signal.
    Failed(ExitStatus),
    /// Never started (missing binary, not executable, ...).
    LaunchFailed(io::Error),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl NormCommand {
    /// The fixed flag vector understood by the executable.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--matrix-size".to_string(),
            self.matrix_size.to_string(),
            "--block-size".to_string(),
            self.block_size.to_string(),
            "--number-of-threads".to_string(),
            self.threads.to_string(),
            "--repeats".to_string(),
            self.repeats.to_string(),
            "--impl".to_string(),
            self.implementation.as_str().to_string(),
        ]
    }

    /// Run `exec` and wait for it.
    ///
    /// stdout is written straight into `sink` (which should be opened in
    /// append mode), stderr goes to our own stderr. Blocks the calling
    /// thread until the child exits; there is no timeout.
    pub fn run(&self, exec: &Path, sink: &File) -> RunOutcome {
        let stdout = match sink.try_clone() {
            Ok(file) => Stdio::from(file),
            Err(e) => return RunOutcome::LaunchFailed(e),
        };

        let mut command = Command::new(exec);
        command
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::inherit());

        log::info!("{} {}", exec.display(), self.args().join(" "));

        match command.status() {
            Ok(status) if status.success() => RunOutcome::Succeeded,
            Ok(status) => RunOutcome::Failed(status),
            Err(e) => RunOutcome::LaunchFailed(e),
        }
    }
}
