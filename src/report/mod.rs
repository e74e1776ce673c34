//! Serial vs threaded comparison: joining results, tables and charts.
//!
//! Everything downstream of [`compare`] works on [`ComparisonRow`]s only;
//! raw per-run samples are never looked at again.

pub mod chart;

use crate::record::BenchmarkRecord;
use std::collections::BTreeMap;
use std::fmt::Write;

pub use chart::{ChartBackend, SvgBackend, render_charts};

/// Average total times of both variants at one matrix size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonRow {
    pub matrix_size: usize,
    pub serial_time: f64,
    pub threaded_time: f64,
    /// `serial_time / threaded_time`
    pub speedup: f64,
}

fn average_totals(records: &[BenchmarkRecord]) -> BTreeMap<usize, f64> {
    records
        .iter()
        .map(|r| (r.metadata.matrix_size, r.stats.total.average_time))
        .collect()
}

/// Join both result sets on matrix size, smallest size first.
///
/// Sizes measured by only one variant are left out. If a file holds the
/// same size twice, the later record wins.
pub fn compare(serial: &[BenchmarkRecord], threaded: &[BenchmarkRecord]) -> Vec<ComparisonRow> {
    let threaded = average_totals(threaded);

    average_totals(serial)
        .into_iter()
        .filter_map(|(matrix_size, serial_time)| {
            let threaded_time = *threaded.get(&matrix_size)?;
            Some(ComparisonRow {
                matrix_size,
                serial_time,
                threaded_time,
                speedup: serial_time / threaded_time,
            })
        })
        .collect()
}

/// Markdown table of the comparison.
pub fn markdown_table(rows: &[ComparisonRow]) -> String {
    let mut out = String::new();
    out.push_str("## Runtime vs Matrix Size Results\n");
    out.push_str("| Matrix Size | Serial Time (s) | Threaded Time (s) | Speedup |\n");
    out.push_str("|-------------|-----------------|-------------------|---------|\n");

    for row in rows {
        let _ = writeln!(
            out,
            "| {:<11} | {:<15.6} | {:<17.6} | {:<7.2}x |",
            row.matrix_size, row.serial_time, row.threaded_time, row.speedup
        );
    }
    out
}

/// Plain column layout of the same numbers, fewer decimals.
pub fn analysis_table(rows: &[ComparisonRow]) -> String {
    let mut out = String::new();
    out.push_str("Runtime Comparison Analysis:\n");
    let _ = writeln!(
        out,
        "{:<12} | {:<15} | {:<15} | {:<12}",
        "Matrix Size", "Serial (s)", "Threaded (s)", "Speedup"
    );
    let _ = writeln!(out, "{:<12} | {:<15} | {:<15} | {:<12}", "---", "---", "---", "---");

    for row in rows {
        let _ = writeln!(
            out,
            "{:<12} | {:<15.3} | {:<15.3} | {:<12}",
            row.matrix_size,
            row.serial_time,
            row.threaded_time,
            format!("{:.2}x", row.speedup)
        );
    }
    out
}
