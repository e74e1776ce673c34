//! Error type shared by every stage of a benchmark run.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Topology probing has no strategy for this OS.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// `lscpu` returned a field we could not read as a number.
    #[error("malformed topology field '{field}': {value:?}")]
    MalformedTopology { field: String, value: String },

    /// The topology command itself could not be run.
    #[error("failed to run '{command}': {source}")]
    ProbeCommand {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted result file is not valid benchmark YAML.
    #[error("cannot parse results in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A sweep thread went away without reporting completion.
    #[error("sweep '{0}' stopped before signalling completion")]
    SweepAborted(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
