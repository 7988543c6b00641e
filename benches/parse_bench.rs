use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mdbench::perf::parse_performance;
use mdbench::{aggregate, AlignmentPolicy, ResultTable};

/// stderr of an 18-way sweep: mostly log noise with one footer per instance
fn sweep_stderr() -> String {
    let mut text = String::new();
    for instance in 0..18 {
        for step in 0..200 {
            text.push_str(&format!("step {step} of instance {instance}: pme grid 52 52 52\n"));
        }
        text.push_str("               Core t (s)   Wall t (s)        (%)\n");
        text.push_str(&format!("Performance:      {}        0.165\n", 140.0 + instance as f64));
    }
    text
}

fn bench_parse(c: &mut Criterion) {
    let stderr = sweep_stderr();
    c.bench_function("parse_performance 18 instances", |b| {
        b.iter(|| parse_performance(black_box(&stderr)))
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let tables: Vec<ResultTable> = (0..5)
        .map(|trial| {
            let mut t = ResultTable::default();
            for (i, p) in [1, 2, 4, 6, 9, 18].iter().enumerate() {
                t.push(*p, 100.0 * (i + 1) as f64 + trial as f64);
            }
            t
        })
        .collect();
    c.bench_function("aggregate 5 trials", |b| {
        b.iter(|| aggregate(black_box(&tables), AlignmentPolicy::Strict))
    });
}

criterion_group!(benches, bench_parse, bench_aggregate);
criterion_main!(benches);
