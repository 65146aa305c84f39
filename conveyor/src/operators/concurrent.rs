// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Concurrent `map` / `foreach` runtime (thread-workers mode)
//!
//! A bounded pool of OS threads computing a user transform with prefetch
//! budget `P = C` (concurrency). `foreach` is implemented on top of this
//! engine by a transform that discards its own result and returns the input
//! element unchanged — see [`crate::pipeline::Pipeline::foreach`].
//!
//! ## Demand-driven pulling
//!
//! Every call to `next()` first tops the number of outstanding (submitted
//! but not yet delivered) items up to `P`, pulling from upstream only as far
//! as that budget allows, then blocks for exactly one result. No background
//! thread pulls ahead of what a `next()` call authorizes, so a consumer that
//! stops calling `next()` never causes upstream to be pulled past `P` items
//! beyond what was already delivered.
//!
//! ## Ordering
//!
//! *Ordered* mode buffers early-arriving results until the one matching
//! `next_expected_seq` is available. *Unordered* mode hands back whatever
//! completes first. Both share the same submission and budget logic; only
//! the delivery step differs.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};

use conveyor_domain::{Concurrency, StreamError};

use crate::item::{Item, OpResult};

struct WorkItem<T> {
    seq: u64,
    value: T,
}

struct WorkResult<U> {
    seq: u64,
    outcome: Item<U>,
}

pub struct ConcurrentMap<I, T, U> {
    upstream: I,
    operator: &'static str,
    prefetch: u64,
    ordered: bool,

    input_tx: Option<Sender<WorkItem<T>>>,
    output_rx: Receiver<WorkResult<U>>,
    workers: Vec<JoinHandle<()>>,

    next_seq: u64,
    outstanding: u64,
    upstream_exhausted: bool,
    captured_upstream_error: Option<StreamError>,
    terminal_error_yielded: bool,

    reorder_buffer: HashMap<u64, Item<U>>,
    next_expected: u64,
}

impl<I, T, U> ConcurrentMap<I, T, U>
where
    I: Iterator<Item = Item<T>>,
    T: Send + 'static,
    U: Send + 'static,
{
    pub fn new<F>(upstream: I, transform: F, concurrency: Concurrency, ordered: bool, operator: &'static str) -> Self
    where
        F: Fn(T) -> OpResult<U> + Send + Sync + 'static,
    {
        let prefetch = concurrency.get();
        let (input_tx, input_rx) = bounded::<WorkItem<T>>(prefetch);
        let (output_tx, output_rx) = bounded::<WorkResult<U>>(prefetch);
        let transform = Arc::new(transform);

        let workers = (0..prefetch)
            .map(|_| {
                let input_rx = input_rx.clone();
                let output_tx = output_tx.clone();
                let transform = Arc::clone(&transform);
                std::thread::spawn(move || {
                    while let Ok(WorkItem { seq, value }) = input_rx.recv() {
                        let outcome = transform(value).map_err(|e| StreamError::from_user_error(operator, e));
                        if output_tx.send(WorkResult { seq, outcome }).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(output_tx);

        Self {
            upstream,
            operator,
            prefetch: prefetch as u64,
            ordered,
            input_tx: Some(input_tx),
            output_rx,
            workers,
            next_seq: 0,
            outstanding: 0,
            upstream_exhausted: false,
            captured_upstream_error: None,
            terminal_error_yielded: false,
            reorder_buffer: HashMap::new(),
            next_expected: 0,
        }
    }

    fn fill(&mut self) {
        while self.outstanding < self.prefetch && !self.upstream_exhausted {
            match self.upstream.next() {
                None => self.upstream_exhausted = true,
                Some(Err(e)) => {
                    // Capture and stop pulling; outstanding work still drains.
                    self.captured_upstream_error = Some(e);
                    self.upstream_exhausted = true;
                }
                Some(Ok(value)) => {
                    let seq = self.next_seq;
                    self.next_seq += 1;
                    self.input_tx
                        .as_ref()
                        .expect("input channel open while pulling")
                        .send(WorkItem { seq, value })
                        .expect("worker pool outlives the input sender");
                    self.outstanding += 1;
                }
            }
        }
    }

    fn recv_one(&mut self) -> WorkResult<U> {
        self.output_rx.recv().expect("worker pool outlives the output receiver")
    }
}

impl<I, T, U> Iterator for ConcurrentMap<I, T, U>
where
    I: Iterator<Item = Item<T>>,
    T: Send + 'static,
    U: Send + 'static,
{
    type Item = Item<U>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.terminal_error_yielded {
            return None;
        }

        self.fill();

        if self.outstanding == 0 && self.upstream_exhausted {
            return self.captured_upstream_error.take().map(|e| {
                self.terminal_error_yielded = true;
                Err(e)
            });
        }

        if self.ordered {
            if let Some(outcome) = self.reorder_buffer.remove(&self.next_expected) {
                self.next_expected += 1;
                self.outstanding -= 1;
                return Some(outcome);
            }
            loop {
                let WorkResult { seq, outcome } = self.recv_one();
                if seq == self.next_expected {
                    self.next_expected += 1;
                    self.outstanding -= 1;
                    return Some(outcome);
                }
                self.reorder_buffer.insert(seq, outcome);
            }
        } else {
            let WorkResult { outcome, .. } = self.recv_one();
            self.outstanding -= 1;
            Some(outcome)
        }
    }
}

impl<I, T, U> Drop for ConcurrentMap<I, T, U> {
    fn drop(&mut self) {
        // Dropping the sender disconnects every worker's input channel, so
        // each worker's `recv()` loop exits and the thread returns.
        self.input_tx.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
