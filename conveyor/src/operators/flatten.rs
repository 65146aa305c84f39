// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `flatten`
//!
//! Drains up to `C` upstream sub-iterables concurrently and delivers their
//! elements to the consumer. Fairness across sub-iterables for `C > 1` is a
//! deliberate design choice: admitted sub-iterators are independent
//! producers into one shared output channel, fastest wins, no forced
//! alternation, rather than strict round-robin turn-taking, which lets a
//! slow sub-iterable fall behind without blocking its faster peers.
//!
//! `C = 1` instead drains each sub-iterable to exhaustion before opening the
//! next, in upstream order, with no threads involved.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};

use conveyor_domain::StreamError;

use crate::item::{BoxIter, Item};

type OpenFn<T, V> = Arc<dyn Fn(T) -> Result<BoxIter<V>, StreamError> + Send + Sync>;

pub struct FlattenSequential<I, T, V> {
    upstream: I,
    open: OpenFn<T, V>,
    current: Option<BoxIter<V>>,
}

impl<I, T, V> FlattenSequential<I, T, V> {
    pub fn new(upstream: I, open: OpenFn<T, V>) -> Self {
        Self { upstream, open, current: None }
    }
}

impl<I, T, V> Iterator for FlattenSequential<I, T, V>
where
    I: Iterator<Item = Item<T>>,
{
    type Item = Item<V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(item) = current.next() {
                    return Some(item);
                }
                self.current = None;
            }
            match self.upstream.next()? {
                Err(e) => return Some(Err(e)),
                Ok(value) => match (self.open)(value) {
                    Err(e) => return Some(Err(e)),
                    Ok(iter) => self.current = Some(iter),
                },
            }
        }
    }
}

enum SlotEvent<V> {
    Item(Item<V>),
    Done,
}

pub struct FlattenConcurrent<I, T, V> {
    upstream: I,
    open: OpenFn<T, V>,
    capacity: usize,
    admitted: usize,
    upstream_exhausted: bool,
    event_tx: Sender<SlotEvent<V>>,
    event_rx: Option<Receiver<SlotEvent<V>>>,
    workers: Vec<JoinHandle<()>>,
}

impl<I, T, V> FlattenConcurrent<I, T, V>
where
    I: Iterator<Item = Item<T>>,
    T: Send + 'static,
    V: Send + 'static,
{
    pub fn new(upstream: I, open: OpenFn<T, V>, capacity: usize) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            upstream,
            open,
            capacity: capacity.max(1),
            admitted: 0,
            upstream_exhausted: false,
            event_tx,
            event_rx: Some(event_rx),
            workers: Vec::new(),
        }
    }

    fn admit_more(&mut self) {
        while self.admitted < self.capacity && !self.upstream_exhausted {
            match self.upstream.next() {
                None => self.upstream_exhausted = true,
                Some(Err(e)) => {
                    // An error in the sequence of sub-iterables itself (not a
                    // slot) is surfaced at its position without consuming a
                    // concurrency slot.
                    let _ = self.event_tx.send(SlotEvent::Item(Err(e)));
                }
                Some(Ok(value)) => {
                    self.admitted += 1;
                    let open = Arc::clone(&self.open);
                    let tx = self.event_tx.clone();
                    self.workers.push(std::thread::spawn(move || {
                        match open(value) {
                            Err(e) => {
                                let _ = tx.send(SlotEvent::Item(Err(e)));
                            }
                            Ok(iter) => {
                                for item in iter {
                                    if tx.send(SlotEvent::Item(item)).is_err() {
                                        return;
                                    }
                                }
                            }
                        }
                        let _ = tx.send(SlotEvent::Done);
                    }));
                }
            }
        }
    }
}

impl<I, T, V> Iterator for FlattenConcurrent<I, T, V>
where
    I: Iterator<Item = Item<T>>,
    T: Send + 'static,
    V: Send + 'static,
{
    type Item = Item<V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.admit_more();
            if self.admitted == 0 && self.upstream_exhausted {
                return None;
            }
            match self.event_rx.as_ref().expect("receiver open while iterating").recv() {
                Ok(SlotEvent::Item(item)) => return Some(item),
                Ok(SlotEvent::Done) => {
                    self.admitted -= 1;
                }
                Err(_) => return None,
            }
        }
    }
}

impl<I, T, V> Drop for FlattenConcurrent<I, T, V> {
    fn drop(&mut self) {
        // Dropping the receiver makes every worker's next send fail, which
        // stops it from draining a sub-iterator nobody will read from.
        self.event_rx.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
