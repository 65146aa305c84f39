// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end scenarios exercising the fluent builder, not just individual
//! operator runtimes in isolation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use conveyor::source;
use conveyor::Pipeline;
use conveyor_domain::{BatchSize, Concurrency, DeliveryOrder, Interval, PerSecond, StreamError};

#[test]
fn ordered_concurrent_map_preserves_input_order() {
    let pipeline = Pipeline::from_source(source::from_iterable(0..255))
        .map(|v: i64| Ok(v * v), Concurrency::new(4).unwrap(), DeliveryOrder::Ordered);
    let out: Vec<_> = pipeline.iter().unwrap().map(Result::unwrap).collect();
    let expected: Vec<_> = (0..255).map(|v: i64| v * v).collect();
    assert_eq!(out, expected);
}

#[test]
fn unordered_concurrent_map_multiset_matches_sequential() {
    let durations = [Duration::from_millis(40), Duration::from_millis(4), Duration::from_millis(80)];
    let pipeline = Pipeline::from_source(source::from_iterable(durations.to_vec())).map(
        |d: Duration| {
            std::thread::sleep(d);
            Ok(d)
        },
        Concurrency::new(2).unwrap(),
        DeliveryOrder::Unordered,
    );
    let started = Instant::now();
    let mut out: Vec<_> = pipeline.iter().unwrap().map(Result::unwrap).collect();
    let elapsed = started.elapsed();
    out.sort();
    assert_eq!(out, vec![Duration::from_millis(4), Duration::from_millis(40), Duration::from_millis(80)]);
    assert!(elapsed < Duration::from_millis(200), "unordered delivery should not serialize on the slowest input: {elapsed:?}");
}

#[test]
fn limit_then_element_error_continues_until_limit_then_ends() {
    let n = 10usize;
    let pipeline = Pipeline::from_source(source::from_iterable(0..n))
        .map(
            |i: usize| if i == 0 { Err("division by zero".into()) } else { Ok(1.0 / i as f64) },
            Concurrency::sequential(),
            DeliveryOrder::Ordered,
        )
        .limit(Some(n / 2), None::<fn(&f64) -> conveyor::OpResult<bool>>)
        .unwrap();

    // The element-0 error doesn't count against the limit budget — only
    // successfully-yielded elements do — so the output is one error plus
    // `n / 2` successes.
    let out: Vec<_> = pipeline.iter().unwrap().collect();
    assert_eq!(out.len(), n / 2 + 1);
    assert!(out[0].is_err());
    for item in &out[1..] {
        assert!(item.is_ok());
    }
}

#[test]
fn keyed_group_splits_by_parity_in_arrival_order() {
    let pipeline = Pipeline::from_source(source::from_iterable(0..10)).group_by(BatchSize::bounded(2).unwrap(), Interval::unbounded(), |v: &i32| Ok(v % 2));
    let groups: Vec<_> = pipeline.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(groups, vec![vec![0, 2], vec![1, 3], vec![4, 6], vec![5, 7], vec![8], vec![9]]);
}

#[test]
fn catch_with_finally_raise_defers_first_error() {
    // `Pipeline::catch` wraps the same runtime exercised here directly; a
    // literal error sequence can't come from a plain iterable source (which
    // only carries values), so this drives `Catch` itself rather than
    // routing through the builder.
    let upstream: Vec<Result<i32, StreamError>> = vec![
        Err(StreamError::user_function("TestError")),
        Err(StreamError::user_function("TypeError")),
        Ok(1),
        Ok(2),
        Err(StreamError::user_function("ValueError")),
        Ok(3),
        Err(StreamError::user_function("DivZero")),
    ];
    let caught = conveyor::operators::catch::Catch::new(upstream.into_iter(), HashSet::new(), None, None::<fn() -> i32>, true);
    let out: Vec<_> = caught.collect();
    assert_eq!(out.len(), 4);
    assert_eq!(*out[0].as_ref().unwrap(), 1);
    assert_eq!(*out[1].as_ref().unwrap(), 2);
    assert_eq!(*out[2].as_ref().unwrap(), 3);
    assert!(out[3].is_err());
    assert_eq!(out[3].as_ref().unwrap_err().to_string(), StreamError::user_function("TestError").to_string());
}

#[test]
fn catch_builder_absorbs_filter_errors_with_a_replacement() {
    let pipeline = Pipeline::from_source(source::from_iterable(0..5))
        .filter(|v: &i32| if *v == 2 { Err("boom".into()) } else { Ok(true) })
        .catch(HashSet::new(), None::<fn(&StreamError) -> bool>, Some(|| -1), false);
    let out: Vec<_> = pipeline.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(out, vec![0, 1, -1, 3, 4]);
}

#[test]
fn throttle_bounds_yields_per_second() {
    let pipeline = Pipeline::from_source(source::from_iterable(0..20)).slow(Some(PerSecond::new(50).unwrap()), None).unwrap();
    let started = Instant::now();
    let count = pipeline.iter().unwrap().count();
    let elapsed = started.elapsed();
    assert_eq!(count, 20);
    // 20 elements at <= 50/s takes at least (20-1)/50s, minus scheduling slack.
    assert!(elapsed >= Duration::from_millis(350), "throttle slept too little: {elapsed:?}");
}

#[test]
fn prefetch_bound_holds_through_the_builder() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let pulled_clone = Arc::clone(&pulled);
    let source_iter = (0..1_000i64).inspect(move |_| {
        pulled_clone.fetch_add(1, Ordering::SeqCst);
    });
    let pipeline = Pipeline::from_source(source::from_iterable(source_iter)).map(
        |v: i64| {
            std::thread::sleep(Duration::from_millis(20));
            Ok(v)
        },
        Concurrency::new(3).unwrap(),
        DeliveryOrder::Ordered,
    );
    let mut iter = pipeline.iter().unwrap();
    let _ = iter.next();
    assert!(pulled.load(Ordering::SeqCst) <= 4, "pulled {} items, expected <= C + 1", pulled.load(Ordering::SeqCst));
}

#[test]
fn flatten_concatenates_associatively_at_concurrency_one() {
    use conveyor::item::BoxIter;

    let split: Vec<Vec<i32>> = vec![vec![1], vec![2, 3]];
    let joined: Vec<Vec<i32>> = vec![vec![1, 2, 3]];

    let open = |v: Vec<i32>| Ok(Box::new(v.into_iter().map(Ok)) as BoxIter<i32>);

    let out_split: Vec<_> = Pipeline::from_source(source::from_iterable(split))
        .flatten(Concurrency::sequential(), open)
        .iter()
        .unwrap()
        .map(Result::unwrap)
        .collect();
    let out_joined: Vec<_> = Pipeline::from_source(source::from_iterable(joined))
        .flatten(Concurrency::sequential(), open)
        .iter()
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(out_split, out_joined);
}

#[test]
fn cooperative_amap_runs_synchronously_from_inside_a_tokio_main() {
    // Mirrors `conveyor-cli`: a `#[tokio::main]`-style binary that builds an
    // `amap` pipeline and drives it with a plain `for` loop on the same task
    // the runtime is executing. This used to panic ("Cannot block the
    // current thread from within a runtime") because the backend bridged
    // into tokio's blocking channel APIs on that very thread.
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let out = runtime.block_on(async {
        let pipeline = Pipeline::from_source(source::from_iterable(0..50i64)).amap(
            |v: i64| async move { Ok(v * v) },
            Concurrency::new(4).unwrap(),
            DeliveryOrder::Ordered,
        );
        pipeline.iter().unwrap().map(Result::unwrap).collect::<Vec<_>>()
    });
    let expected: Vec<_> = (0..50i64).map(|v| v * v).collect();
    assert_eq!(out, expected);
}

#[test]
fn limit_zero_yields_nothing_through_the_builder() {
    let pipeline = Pipeline::from_source(source::from_iterable(0..10))
        .limit(Some(0), None::<fn(&i32) -> conveyor::OpResult<bool>>)
        .unwrap();
    let out: Vec<_> = pipeline.iter().unwrap().collect();
    assert!(out.is_empty());
}

#[test]
fn rematerialization_is_independent() {
    let pipeline = Pipeline::from_source(source::from_iterable(0..5)).filter(|v: &i32| Ok(v % 2 == 0));
    let first: Vec<_> = pipeline.iter().unwrap().map(Result::unwrap).collect();
    let second: Vec<_> = pipeline.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(first, second);
    assert_eq!(first, vec![0, 2, 4]);
}
