use normbench::orchestrator::{BenchmarkPlan, benchmark, prepare_sink, run_concurrently};
use normbench::record::{Implementation, read_records};
use normbench::sweep::{SweepReport, SweepUnit, matrix_sizes};
use normbench::Error;
use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Sweep stand-in that only finishes once its gate is opened.
struct GatedUnit {
    label: &'static str,
    gate: Receiver<()>,
}

impl SweepUnit for GatedUnit {
    fn label(&self) -> String {
        self.label.to_string()
    }

    fn run(self: Box<Self>) -> SweepReport {
        let _ = self.gate.recv();
        SweepReport {
            label: self.label.to_string(),
            completed: vec![1024],
            failed: Vec::new(),
        }
    }
}

struct PanickingUnit;

impl SweepUnit for PanickingUnit {
    fn label(&self) -> String {
        "broken".to_string()
    }

    fn run(self: Box<Self>) -> SweepReport {
        panic!("sweep blew up");
    }
}

fn gated(label: &'static str) -> (Sender<()>, Box<dyn SweepUnit>) {
    let (tx, rx) = mpsc::channel();
    (tx, Box::new(GatedUnit { label, gate: rx }))
}

/// Launch the fan-in on a helper thread and expose whether it returned.
fn spawn_waiter(
    units: Vec<Box<dyn SweepUnit>>,
) -> (Arc<AtomicBool>, thread::JoinHandle<normbench::Result<Vec<SweepReport>>>) {
    let returned = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&returned);
    let handle = thread::spawn(move || {
        let result = run_concurrently(units);
        flag.store(true, Ordering::SeqCst);
        result
    });
    (returned, handle)
}

// ============================================================
// Fan-in of completion signals
// ============================================================

#[test]
fn test_waits_for_both_signals() {
    let (open_serial, serial) = gated("serial");
    let (open_threaded, threaded) = gated("threaded");
    let (returned, handle) = spawn_waiter(vec![serial, threaded]);

    open_serial.send(()).unwrap();
    thread::sleep(Duration::from_millis(150));
    assert!(
        !returned.load(Ordering::SeqCst),
        "returned with only one of two sweeps done"
    );

    open_threaded.send(()).unwrap();
    let reports = handle.join().unwrap().unwrap();
    assert!(returned.load(Ordering::SeqCst));
    assert_eq!(reports.len(), 2);
}

#[test]
fn test_completion_order_does_not_matter() {
    let (open_serial, serial) = gated("serial");
    let (open_threaded, threaded) = gated("threaded");
    let (returned, handle) = spawn_waiter(vec![serial, threaded]);

    // threaded finishes first this time
    open_threaded.send(()).unwrap();
    thread::sleep(Duration::from_millis(150));
    assert!(!returned.load(Ordering::SeqCst));

    open_serial.send(()).unwrap();
    let reports = handle.join().unwrap().unwrap();
    let labels: Vec<_> = reports.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["serial", "threaded"]);
}

#[test]
fn test_fan_in_is_not_limited_to_two() {
    let mut gates = Vec::new();
    let mut units = Vec::new();
    for label in ["a", "b", "c", "d", "e"] {
        let (tx, unit) = gated(label);
        gates.push(tx);
        units.push(unit);
    }
    let (returned, handle) = spawn_waiter(units);

    for gate in gates.iter().rev().skip(1) {
        gate.send(()).unwrap();
    }
    thread::sleep(Duration::from_millis(150));
    assert!(!returned.load(Ordering::SeqCst));

    gates[4].send(()).unwrap();
    assert_eq!(handle.join().unwrap().unwrap().len(), 5);
}

#[test]
fn test_unit_dying_without_signal_is_reported() {
    let (open, ok_unit) = gated("serial");
    open.send(()).unwrap();

    let result = run_concurrently(vec![ok_unit, Box::new(PanickingUnit)]);
    match result {
        Err(Error::SweepAborted(label)) => assert_eq!(label, "broken"),
        other => panic!("expected SweepAborted, got {:?}", other),
    }
}

// ============================================================
// Output sinks
// ============================================================

#[test]
fn test_sink_truncated_on_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("serial.yaml");

    let mut first = prepare_sink(&path).unwrap();
    writeln!(first, "first run").unwrap();
    drop(first);

    let mut second = prepare_sink(&path).unwrap();
    writeln!(second, "second run").unwrap();
    drop(second);

    assert_eq!(fs::read_to_string(&path).unwrap(), "second run\n");
}

#[test]
fn test_sink_appends_within_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("threaded.yaml");

    let sink = prepare_sink(&path).unwrap();
    let mut a = sink.try_clone().unwrap();
    let mut b = sink;
    writeln!(a, "one").unwrap();
    writeln!(b, "two").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
}

// ============================================================
// End to end against a fake executable
// ============================================================

#[cfg(unix)]
mod fake_executable {
    //! These tests write an executable and then spawn it. A file still open
    //! for writing in one test can leak into a child forked by another test,
    //! and exec of that file then fails with ETXTBSY. `#[serial]` keeps the
    //! write-then-spawn sequences from interleaving.

    use super::*;
    use normbench::sweep::fit_block_size;
    use normbench::topology::{CacheHierarchy, optimal_block_size};
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Same check the real executable makes before doing any work.
    const REJECT_UNEVEN_BLOCKS: &str =
        r#"if [ $((size % block)) -ne 0 ]; then echo "norm: block size must divide matrix size" >&2; exit 1; fi"#;

    const SCRIPT: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --matrix-size) size="$2" ;;
    --block-size) block="$2" ;;
    --number-of-threads) threads="$2" ;;
    --repeats) repeats="$2" ;;
    --impl) impl="$2" ;;
  esac
  shift 2
done
__FAIL_HOOK__
cat <<EOF
benchmark_results:
  metadata:
    implementation: "$impl"
    matrix_size: $size
    block_size: $block
    num_threads: $threads
    num_repeats: $repeats
    timestamp: 1718000000
  statistics:
    multiplication:
      average_time: 0.300000000
      min_time: 0.300000000
      max_time: 0.300000000
    norm_computation:
      average_time: 0.100000000
      min_time: 0.100000000
      max_time: 0.100000000
    total:
      average_time: 0.400000000
      min_time: 0.400000000
      max_time: 0.400000000
  individual_runs:
    - run: 1
      multiplication_time: 0.300000000
      norm_time: 0.100000000
      total_time: 0.400000000
EOF
"#;

    fn write_script(dir: &Path, fail_hook: &str) -> PathBuf {
        let path = dir.join("norm");
        fs::write(&path, SCRIPT.replace("__FAIL_HOOK__", fail_hook)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn plan(exec: PathBuf, output_dir: PathBuf) -> BenchmarkPlan {
        BenchmarkPlan {
            block_size: 128,
            threads: 6,
            repeats: 2,
            exec_path: exec,
            output_dir,
        }
    }

    #[test]
    #[serial]
    fn test_full_run_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let exec = write_script(dir.path(), "");
        let out = dir.path().join("results");

        let reports = benchmark(&plan(exec, out.clone())).unwrap();
        let all_sizes: Vec<usize> = matrix_sizes().collect();
        for report in &reports {
            assert_eq!(report.completed, all_sizes);
            assert!(report.failed.is_empty());
        }

        let serial = read_records(&out.join("serial.yaml")).unwrap();
        let threaded = read_records(&out.join("threaded.yaml")).unwrap();

        let sizes = |records: &[normbench::BenchmarkRecord]| -> Vec<usize> {
            records.iter().map(|r| r.metadata.matrix_size).collect()
        };
        assert_eq!(sizes(&serial), all_sizes);
        assert_eq!(sizes(&threaded), all_sizes);

        assert!(serial.iter().all(|r| r.metadata.num_threads == 1
            && r.metadata.implementation == Implementation::Serial));
        assert!(threaded.iter().all(|r| r.metadata.num_threads == 6
            && r.metadata.implementation == Implementation::Threaded));
        assert!(
            serial
                .iter()
                .chain(&threaded)
                .all(|r| r.metadata.block_size == 128 && r.metadata.num_repeats == 2)
        );
    }

    #[test]
    #[serial]
    fn test_second_run_replaces_first() {
        let dir = tempfile::tempdir().unwrap();
        let exec = write_script(dir.path(), "");
        let out = dir.path().join("results");

        benchmark(&plan(exec.clone(), out.clone())).unwrap();
        benchmark(&plan(exec, out.clone())).unwrap();

        assert_eq!(read_records(&out.join("serial.yaml")).unwrap().len(), 7);
        assert_eq!(read_records(&out.join("threaded.yaml")).unwrap().len(), 7);
    }

    // Best-effort policy: a crashing size leaves a hole in the file and a
    // note in the report, and the sweep carries on with the next size.
    #[test]
    #[serial]
    fn test_failing_size_is_skipped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let exec = write_script(
            dir.path(),
            r#"if [ "$size" = "2048" ]; then echo "norm: out of memory" >&2; exit 3; fi"#,
        );
        let out = dir.path().join("results");

        let reports = benchmark(&plan(exec, out.clone())).unwrap();
        for report in &reports {
            assert_eq!(report.failed, vec![2048]);
            assert_eq!(report.completed.len(), 6);
        }

        let serial = read_records(&out.join("serial.yaml")).unwrap();
        assert_eq!(serial.len(), 6);
        assert!(serial.iter().all(|r| r.metadata.matrix_size != 2048));
    }

    #[test]
    #[serial]
    fn test_cache_derived_block_size_is_accepted_for_every_size() {
        let dir = tempfile::tempdir().unwrap();
        let exec = write_script(dir.path(), REJECT_UNEVEN_BLOCKS);
        let out = dir.path().join("results");

        let hierarchy = CacheHierarchy {
            logical_cores: 16,
            l1d_cache: 48 * 1024,
            l2_cache: 2 << 20,
            l3_cache: 32 << 20,
        };
        let mut plan = plan(exec, out.clone());
        plan.block_size = fit_block_size(optimal_block_size(&hierarchy));
        assert!(matrix_sizes().all(|size| size % plan.block_size == 0));

        let reports = benchmark(&plan).unwrap();
        for report in &reports {
            assert!(report.failed.is_empty(), "{:?}", report.failed);
        }
        assert_eq!(read_records(&out.join("serial.yaml")).unwrap().len(), 7);
        assert_eq!(read_records(&out.join("threaded.yaml")).unwrap().len(), 7);
    }

    #[test]
    #[serial]
    fn test_uneven_block_size_fails_every_size() {
        let dir = tempfile::tempdir().unwrap();
        let exec = write_script(dir.path(), REJECT_UNEVEN_BLOCKS);
        let out = dir.path().join("results");

        let mut plan = plan(exec, out.clone());
        plan.block_size = 1182;
        let reports = benchmark(&plan).unwrap();
        for report in &reports {
            assert!(report.completed.is_empty());
            assert_eq!(report.failed.len(), 7);
        }
    }

    #[test]
    #[serial]
    fn test_missing_executable_yields_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("results");

        let reports = benchmark(&plan(dir.path().join("absent"), out.clone())).unwrap();
        assert!(reports.iter().all(|r| r.completed.is_empty()));
        assert!(read_records(&out.join("serial.yaml")).unwrap().is_empty());
        assert!(read_records(&out.join("threaded.yaml")).unwrap().is_empty());
    }
}

// A hung executable stalls its sweep forever: there is no timeout or
// cancellation, so that path is deliberately left untested.
