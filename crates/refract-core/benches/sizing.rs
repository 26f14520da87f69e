//! Benchmarks for dimension normalization and upload reduction planning.
//!
//! Run with: cargo bench -p refract-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use refract_core::codec::{plan_reduction, UploadBudget};
use refract_core::sizing::{normalize, Dimensions, SizeLimits};

fn benchmark_normalize(c: &mut Criterion) {
    let limits = SizeLimits::default();

    c.bench_function("normalize_oversized", |b| {
        b.iter(|| normalize(black_box(8000), black_box(6000), &limits))
    });

    c.bench_function("normalize_grid", |b| {
        b.iter(|| {
            for w in (100..10_000).step_by(997) {
                for h in (100..10_000).step_by(1009) {
                    let _ = normalize(black_box(w), black_box(h), &limits);
                }
            }
        })
    });
}

fn benchmark_plan_reduction(c: &mut Criterion) {
    let budget = UploadBudget::default();
    let source = Dimensions {
        width: 12_000,
        height: 9_000,
    };

    c.bench_function("plan_reduction_oversized", |b| {
        b.iter(|| plan_reduction(black_box(source), black_box(30 * 1024 * 1024), &budget))
    });
}

criterion_group!(benches, benchmark_normalize, benchmark_plan_reduction);
criterion_main!(benches);
