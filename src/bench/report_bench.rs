use criterion::{Criterion, black_box, criterion_group, criterion_main};
use normbench::record::{Implementation, parse_records};
use normbench::report::{compare, markdown_table};
use normbench::topology::lscpu::parse_lscpu;

const LSCPU: &str = "\
Architecture:                    x86_64
CPU(s):                          32
On-line CPU(s) list:             0-31
Model name:                      AMD Ryzen 9 7950X 16-Core Processor
Caches (sum of all):
  L1d:                           512 KiB (16 instances)
  L1i:                           512 KiB (16 instances)
  L2:                            16 MiB (16 instances)
  L3:                            64 MiB (2 instances)
NUMA:
  NUMA node(s):                  1
  NUMA node0 CPU(s):             0-31
";

fn results_yaml(implementation: Implementation, scale: f64) -> String {
    let mut out = String::new();
    for size in (1024..=4096).step_by(512) {
        let t = scale * (size as f64 / 1024.0).powi(3);
        out.push_str(&format!(
            "- metadata: {{implementation: {}, matrix_size: {}, block_size: 256, num_threads: 8, num_repeats: 1, timestamp: 0}}
  statistics:
    multiplication: {{average_time: {t}, min_time: {t}, max_time: {t}}}
    norm_computation: {{average_time: 0.0, min_time: 0.0, max_time: 0.0}}
    total: {{average_time: {t}, min_time: {t}, max_time: {t}}}
  individual_runs:
    - {{run: 1, multiplication_time: {t}, norm_time: 0.0, total_time: {t}}}
",
            implementation, size
        ));
    }
    out
}

fn bench_lscpu(c: &mut Criterion) {
    c.bench_function("parse_lscpu", |b| {
        b.iter(|| parse_lscpu(black_box(LSCPU)).unwrap())
    });
}

fn bench_compare(c: &mut Criterion) {
    let serial = parse_records(&results_yaml(Implementation::Serial, 0.4)).unwrap();
    let threaded = parse_records(&results_yaml(Implementation::Threaded, 0.1)).unwrap();

    c.bench_function("parse_records", |b| {
        let text = results_yaml(Implementation::Serial, 0.4);
        b.iter(|| parse_records(black_box(&text)).unwrap())
    });

    c.bench_function("compare_and_table", |b| {
        b.iter(|| markdown_table(&compare(black_box(&serial), black_box(&threaded))))
    });
}

criterion_group!(benches, bench_lscpu, bench_compare);
criterion_main!(benches);
