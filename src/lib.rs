//! Serial vs threaded matrix-norm benchmarking, driven from the outside.
//!
//! The norm executable does the actual math; this crate decides how to run
//! it and what to make of the numbers:
//!
//! - probe the CPU caches and derive a block size from them
//! - sweep matrix sizes 1024..=4096 for the serial and the threaded
//!   implementation at the same time, each writing its own YAML file
//! - read both files back, join them by matrix size and report speedups
//!
//! ## Usage
//!
//! ```no_run
//! use normbench::orchestrator::{benchmark, BenchmarkPlan};
//! use normbench::topology::{optimal_block_size, platform_probe};
//!
//! let caches = platform_probe()?.probe()?;
//! let plan = BenchmarkPlan {
//!     block_size: optimal_block_size(&caches),
//!     threads: caches.thread_count(),
//!     repeats: 10,
//!     exec_path: "./bin/norm".into(),
//!     output_dir: "./out".into(),
//! };
//! benchmark(&plan)?;
//! # Ok::<(), normbench::Error>(())
//! ```
//!
//! Comparing finished runs needs no executable at all:
//!
//! ```
//! use normbench::record::parse_records;
//! use normbench::report::{compare, markdown_table};
//!
//! let serial = parse_records("[]").unwrap();
//! let threaded = parse_records("").unwrap();
//! let rows = compare(&serial, &threaded);
//! assert!(rows.is_empty());
//! print!("{}", markdown_table(&rows));
//! ```

pub mod cli;
pub mod error;
pub mod orchestrator;
pub mod record;
pub mod report;
pub mod runner;
pub mod sweep;
pub mod topology;

pub use error::{Error, Result};
pub use record::{BenchmarkRecord, Implementation};
pub use report::ComparisonRow;
pub use topology::{CacheHierarchy, optimal_block_size};
