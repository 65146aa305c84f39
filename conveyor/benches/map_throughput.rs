// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Throughput benchmarks for the concurrent `map` operator across worker
//! counts and delivery orders.
//!
//! Run with:
//! ```bash
//! cargo bench --bench map_throughput
//! ```

use conveyor::source;
use conveyor::Pipeline;
use conveyor_domain::{Concurrency, DeliveryOrder};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_ordered_vs_unordered(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_delivery_order");
    for concurrency in [1usize, 2, 4, 8] {
        for order in [DeliveryOrder::Ordered, DeliveryOrder::Unordered] {
            let id = BenchmarkId::new(format!("{order:?}"), concurrency);
            group.bench_with_input(id, &concurrency, |b, &concurrency| {
                b.iter(|| {
                    let pipeline = Pipeline::from_source(source::from_iterable(0..2_000i64))
                        .map(|v: i64| Ok(v.wrapping_mul(v)), Concurrency::new(concurrency).unwrap(), order);
                    let count = pipeline.iter().unwrap().filter(Result::is_ok).count();
                    black_box(count)
                });
            });
        }
    }
    group.finish();
}

fn bench_sequential_chain(c: &mut Criterion) {
    c.bench_function("map_filter_batch_sequential", |b| {
        b.iter(|| {
            let pipeline = Pipeline::from_source(source::from_iterable(0..5_000i64))
                .map(|v: i64| Ok(v + 1), Concurrency::sequential(), DeliveryOrder::Ordered)
                .filter(|v: &i64| Ok(v % 2 == 0))
                .batch(conveyor_domain::BatchSize::bounded(32).unwrap(), conveyor_domain::Interval::unbounded());
            black_box(pipeline.iter().unwrap().count())
        });
    });
}

criterion_group!(benches, bench_ordered_vs_unordered, bench_sequential_chain);
criterion_main!(benches);
