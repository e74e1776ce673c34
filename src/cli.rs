//! Command-line surface of the `normbench` binary.
//!
//! Two modes:
//! - run (default): probe the CPU, sweep both implementations, write results
//! - `--plot`: read existing results, print tables, render charts

use crate::error::Result;
use crate::orchestrator::{BenchmarkPlan, benchmark};
use crate::record::{Implementation, read_records};
use crate::report::{self, SvgBackend, render_charts};
use crate::sweep::{divides_sweep, fit_block_size};
use crate::topology::{CacheHierarchy, optimal_block_size, platform_probe};
use clap::Parser;
use env_logger::Target;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::path::PathBuf;

/// Repeats per matrix size unless `--repeats` says otherwise.
pub const DEFAULT_REPEATS: usize = 50;

/// Benchmark a serial and a threaded matrix-norm implementation against each other
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "normbench")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to executable to benchmark
    #[arg(long, value_name = "PATH", default_value = "./bin/norm")]
    pub exec: PathBuf,

    /// Output directory for benchmark results
    #[arg(long, value_name = "DIR", default_value = "./out")]
    pub output_dir: PathBuf,

    /// Path to existing benchmark results for plotting (used with --plot)
    #[arg(long, value_name = "DIR", default_value = "./results")]
    pub results_path: PathBuf,

    /// Output directory for generated plot images
    #[arg(long, value_name = "DIR", default_value = "./images")]
    pub images_path: PathBuf,

    /// Create charts from existing results instead of running benchmarks
    #[arg(long)]
    pub plot: bool,

    /// Enable verbose output
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Repetitions per matrix size
    #[arg(long, value_name = "N", default_value_t = DEFAULT_REPEATS, value_parser = parse_positive)]
    pub repeats: usize,

    /// Block size to pass instead of the cache-derived one
    #[arg(long, value_name = "N", value_parser = parse_positive)]
    pub block_size: Option<usize>,
}

fn parse_positive(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Set up `env_logger`. Warnings and errors always go to stderr; with
/// `verbose`, info records are added on stdout. `RUST_LOG` still applies on top.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    let logger = SplitLogger {
        stdout: env_logger_for(level, Target::Stdout),
        stderr: env_logger_for(level, Target::Stderr),
    };

    // a second init (tests, embedding) keeps the first logger
    let max_level = logger.stdout.filter().max(logger.stderr.filter());
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
}

fn env_logger_for(level: LevelFilter, target: Target) -> env_logger::Logger {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env()
        .target(target)
        .build()
}

/// Diagnostics (warn and above) on stderr, progress on stdout.
fn goes_to_stderr(level: Level) -> bool {
    level <= Level::Warn
}

struct SplitLogger {
    stdout: env_logger::Logger,
    stderr: env_logger::Logger,
}

impl SplitLogger {
    fn pick(&self, level: Level) -> &env_logger::Logger {
        if goes_to_stderr(level) {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

impl Log for SplitLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.pick(metadata.level()).enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        self.pick(record.level()).log(record);
    }

    fn flush(&self) {
        self.stdout.flush();
        self.stderr.flush();
    }
}

/// Execute whichever mode the flags select.
pub fn run(cli: &Cli) -> Result<()> {
    log::info!("Using executable: {}", cli.exec.display());
    log::info!("Output directory: {}", cli.output_dir.display());

    if cli.plot {
        log::info!("Image output directory: {}", cli.images_path.display());
        plot(cli)
    } else {
        run_benchmarks(cli)
    }
}

fn run_benchmarks(cli: &Cli) -> Result<()> {
    let hierarchy = platform_probe()?.probe()?;
    log::info!(
        "CPU Info: {} cores, L1d: {} KB, L2: {} KB, L3: {} KB",
        hierarchy.logical_cores,
        hierarchy.l1d_cache / 1024,
        hierarchy.l2_cache / 1024,
        hierarchy.l3_cache / 1024
    );

    let plan = plan_for(cli, &hierarchy);
    log::info!(
        "Starting benchmark execution (block size {}, {} threads, {} repeats)...",
        plan.block_size,
        plan.threads,
        plan.repeats
    );

    for report in benchmark(&plan)? {
        if !report.failed.is_empty() {
            log::warn!(
                "{}: no results for matrix sizes {:?}",
                report.label,
                report.failed
            );
        }
    }

    log::info!("Benchmark completed!");
    Ok(())
}

/// Settings for both sweeps. A derived block size is fitted to the sweep;
/// an explicit `--block-size` is passed through as given.
fn plan_for(cli: &Cli, hierarchy: &CacheHierarchy) -> BenchmarkPlan {
    let block_size = match cli.block_size {
        Some(block_size) => {
            if !divides_sweep(block_size) {
                log::warn!(
                    "block size {} does not divide every matrix size; those sizes will fail",
                    block_size
                );
            }
            block_size
        }
        None => {
            let derived = optimal_block_size(hierarchy);
            let fitted = fit_block_size(derived);
            log::info!("Cache-derived block size {}, using {}", derived, fitted);
            fitted
        }
    };

    BenchmarkPlan {
        block_size,
        threads: hierarchy.thread_count(),
        repeats: cli.repeats,
        exec_path: cli.exec.clone(),
        output_dir: cli.output_dir.clone(),
    }
}

fn plot(cli: &Cli) -> Result<()> {
    log::info!("Creating plots from results in: {}", cli.results_path.display());

    let serial = read_records(&cli.results_path.join(Implementation::Serial.results_file()))?;
    let threaded = read_records(&cli.results_path.join(Implementation::Threaded.results_file()))?;

    let rows = report::compare(&serial, &threaded);
    println!();
    print!("{}", report::markdown_table(&rows));
    println!();
    print!("{}", report::analysis_table(&rows));

    render_charts(&rows, &cli.images_path, &SvgBackend::default())?;
    Ok(())
}
