// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Concurrent `amap` / `aforeach` runtime (cooperative-tasks mode)
//!
//! The async counterpart to [`crate::operators::concurrent::ConcurrentMap`]:
//! identical contract (prefetch budget `P = C`, ordered/unordered delivery,
//! positional exception surfacing), but workers are tokio tasks suspending
//! at `.await` points inside the transform instead of OS threads blocking
//! inside it.
//!
//! The public iterator stays synchronous, but it must be safe to drive from
//! *any* calling thread, including one already driving a tokio runtime (e.g.
//! the task `#[tokio::main]` hands `block_on`, or another spawned task) —
//! that is exactly how a CLI built on `#[tokio::main]` ends up calling
//! `next()`. Tokio's own bridges (`Receiver::blocking_recv`,
//! `Sender::blocking_send`) panic in that situation ("Cannot block the
//! current thread from within a runtime"), so the submit/collect loop that
//! needs them runs on a dedicated plain OS thread spawned in [`new`] —
//! never a runtime worker — and forwards each result to the caller over an
//! ordinary [`crossbeam_channel`]. That channel involves no tokio state, so
//! blocking on it from a runtime thread is always safe, just like the
//! equivalent thread-pool bridge in [`crate::operators::concurrent`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::thread::JoinHandle as ThreadHandle;

use crossbeam_channel::{bounded, Receiver as ResultReceiver, Sender as ResultSender};
use tokio::runtime::Handle;
use tokio::sync::mpsc::channel;

use conveyor_domain::StreamError;

use crate::item::{Item, OpResult};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

struct WorkItem<T> {
    seq: u64,
    value: T,
}

struct WorkResult<U> {
    seq: u64,
    outcome: Item<U>,
}

pub struct ConcurrentMapAsync<U> {
    results: Option<ResultReceiver<Item<U>>>,
    bridge: Option<ThreadHandle<()>>,
}

impl<U> ConcurrentMapAsync<U>
where
    U: Send + 'static,
{
    pub fn new<I, T, F, Fut>(upstream: I, transform: F, concurrency: usize, ordered: bool, operator: &'static str, runtime: Handle) -> Self
    where
        I: Iterator<Item = Item<T>> + Send + 'static,
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = OpResult<U>> + Send + 'static,
    {
        let prefetch = concurrency.max(1);
        let (results_tx, results_rx) = bounded::<Item<U>>(prefetch);

        let bridge = std::thread::spawn(move || {
            drive(upstream, transform, prefetch, ordered, operator, runtime, results_tx);
        });

        Self { results: Some(results_rx), bridge: Some(bridge) }
    }
}

/// Runs on the dedicated bridge thread: owns the tokio mpsc channels and the
/// worker tasks, pulls from `upstream`, and pushes each delivered item to
/// `results_tx`. Safe to call `blocking_send`/`blocking_recv` here because
/// this thread never drives the runtime itself — only `runtime.spawn` is
/// used to hand work to it.
fn drive<I, T, U, F, Fut>(mut upstream: I, transform: F, prefetch: usize, ordered: bool, operator: &'static str, runtime: Handle, results_tx: ResultSender<Item<U>>)
where
    I: Iterator<Item = Item<T>> + Send + 'static,
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OpResult<U>> + Send + 'static,
{
    let (input_tx, input_rx) = channel::<WorkItem<T>>(prefetch);
    let (output_tx, mut output_rx) = channel::<WorkResult<U>>(prefetch);
    let transform: Arc<dyn Fn(T) -> BoxFuture<OpResult<U>> + Send + Sync> = Arc::new(move |v| Box::pin(transform(v)));

    // mpsc::Receiver is single-consumer; workers share it behind a mutex so
    // the channel still acts as one pooled work queue.
    let input_rx = Arc::new(tokio::sync::Mutex::new(input_rx));

    let workers: Vec<_> = (0..prefetch)
        .map(|_| {
            let input_rx = Arc::clone(&input_rx);
            let output_tx = output_tx.clone();
            let transform = Arc::clone(&transform);
            runtime.spawn(async move {
                loop {
                    let item = { input_rx.lock().await.recv().await };
                    let Some(WorkItem { seq, value }) = item else { break };
                    let outcome = transform(value).await.map_err(|e| StreamError::from_user_error(operator, e));
                    if output_tx.send(WorkResult { seq, outcome }).await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(output_tx);

    let prefetch = prefetch as u64;
    let mut next_seq = 0u64;
    let mut outstanding = 0u64;
    let mut upstream_exhausted = false;
    let mut captured_upstream_error: Option<StreamError> = None;
    let mut reorder_buffer: HashMap<u64, Item<U>> = HashMap::new();
    let mut next_expected = 0u64;

    'drive: loop {
        while outstanding < prefetch && !upstream_exhausted {
            match upstream.next() {
                None => upstream_exhausted = true,
                Some(Err(e)) => {
                    captured_upstream_error = Some(e);
                    upstream_exhausted = true;
                }
                Some(Ok(value)) => {
                    let seq = next_seq;
                    next_seq += 1;
                    if input_tx.blocking_send(WorkItem { seq, value }).is_err() {
                        break 'drive;
                    }
                    outstanding += 1;
                }
            }
        }

        if outstanding == 0 && upstream_exhausted {
            if let Some(e) = captured_upstream_error.take() {
                let _ = results_tx.send(Err(e));
            }
            break;
        }

        if ordered {
            if let Some(outcome) = reorder_buffer.remove(&next_expected) {
                next_expected += 1;
                outstanding -= 1;
                if results_tx.send(outcome).is_err() {
                    break;
                }
                continue;
            }
            loop {
                let Some(WorkResult { seq, outcome }) = output_rx.blocking_recv() else { break 'drive };
                if seq == next_expected {
                    next_expected += 1;
                    outstanding -= 1;
                    if results_tx.send(outcome).is_err() {
                        break 'drive;
                    }
                    break;
                }
                reorder_buffer.insert(seq, outcome);
            }
        } else {
            let Some(WorkResult { outcome, .. }) = output_rx.blocking_recv() else { break };
            outstanding -= 1;
            if results_tx.send(outcome).is_err() {
                break;
            }
        }
    }

    drop(input_tx);
    for worker in workers {
        worker.abort();
    }
}

impl<U> Iterator for ConcurrentMapAsync<U>
where
    U: Send + 'static,
{
    type Item = Item<U>;

    fn next(&mut self) -> Option<Self::Item> {
        self.results.as_ref().expect("results channel open while iterating").recv().ok()
    }
}

impl<U> Drop for ConcurrentMapAsync<U> {
    fn drop(&mut self) {
        // Dropping the receiver makes the bridge thread's next send fail,
        // unblocking it out of the drive loop so the join below returns.
        self.results.take();
        if let Some(bridge) = self.bridge.take() {
            let _ = bridge.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ok_iter(n: i64) -> impl Iterator<Item = Item<i64>> + Send + 'static {
        (0..n).map(Ok)
    }

    fn test_runtime() -> Handle {
        // Leaked so the runtime (and its worker threads) outlive the test body;
        // each test only constructs a handful of these.
        let rt = Box::leak(Box::new(tokio::runtime::Runtime::new().unwrap()));
        rt.handle().clone()
    }

    #[test]
    fn ordered_matches_sequential_for_any_concurrency() {
        for c in [1, 2, 4, 8] {
            let handle = test_runtime();
            let out: Vec<_> = ConcurrentMapAsync::new(
                ok_iter(255),
                |v: i64| async move { Ok::<_, conveyor_domain::BoxError>(v * v) },
                c,
                true,
                "amap",
                handle,
            )
            .map(Result::unwrap)
            .collect();
            let expected: Vec<_> = (0..255).map(|v: i64| v * v).collect();
            assert_eq!(out, expected, "concurrency={c}");
        }
    }

    #[test]
    fn unordered_multiset_matches_sequential() {
        let handle = test_runtime();
        let mut out: Vec<_> = ConcurrentMapAsync::new(ok_iter(100), |v: i64| async move { Ok::<_, conveyor_domain::BoxError>(v * 2) }, 4, false, "amap", handle)
            .map(Result::unwrap)
            .collect();
        out.sort();
        let expected: Vec<_> = (0..100).map(|v: i64| v * 2).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn element_error_is_positional_and_does_not_truncate() {
        let handle = test_runtime();
        let out: Vec<_> = ConcurrentMapAsync::new(
            ok_iter(5),
            |v: i64| async move { if v == 2 { Err::<i64, _>("boom".into()) } else { Ok(v) } },
            1,
            true,
            "amap",
            handle,
        )
        .collect();
        assert!(out[0].is_ok());
        assert!(out[1].is_ok());
        assert!(out[2].is_err());
        assert!(out[3].is_ok());
        assert!(out[4].is_ok());
    }

    #[test]
    fn upstream_error_surfaces_after_outstanding_work_drains() {
        let handle = test_runtime();
        let upstream: Vec<Item<i64>> = vec![Ok(1), Ok(2), Err(StreamError::source("boom")), Ok(4)];
        let out: Vec<_> =
            ConcurrentMapAsync::new(upstream.into_iter(), |v: i64| async move { Ok::<_, conveyor_domain::BoxError>(v) }, 2, true, "amap", handle).collect();
        assert_eq!(out.len(), 3);
        assert_eq!(*out[0].as_ref().unwrap(), 1);
        assert_eq!(*out[1].as_ref().unwrap(), 2);
        assert!(out[2].is_err());
    }

    #[test]
    fn prefetch_bound_limits_upstream_pulls() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let pulled = Arc::new(AtomicUsize::new(0));
        let pulled_clone = Arc::clone(&pulled);
        let upstream = (0..1_000).map(move |v| {
            pulled_clone.fetch_add(1, Ordering::SeqCst);
            Ok(v)
        });
        let handle = test_runtime();
        let mut engine = ConcurrentMapAsync::new(
            upstream,
            |v: i64| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, conveyor_domain::BoxError>(v)
            },
            4,
            true,
            "amap",
            handle,
        );
        let _ = engine.next();
        assert!(pulled.load(Ordering::SeqCst) <= 5, "pulled {} items, expected <= C + 1", pulled.load(Ordering::SeqCst));
    }

    /// Reproduces the scenario that used to panic: the iterator is driven
    /// synchronously from inside a task the runtime itself is executing,
    /// exactly as a `#[tokio::main]` binary iterating a pipeline does.
    #[test]
    fn driving_from_inside_the_runtime_does_not_panic() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let inner_handle = Handle::current();
            let out: Vec<_> = ConcurrentMapAsync::new(
                ok_iter(50),
                |v: i64| async move { Ok::<_, conveyor_domain::BoxError>(v + 1) },
                4,
                true,
                "amap",
                inner_handle,
            )
            .map(Result::unwrap)
            .collect();
            assert_eq!(out, (1..=50).collect::<Vec<_>>());
        });
    }
}
