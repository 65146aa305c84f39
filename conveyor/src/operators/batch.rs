// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `batch` / `group`: tumbling batches and keyed cogroups, closed by size,
//! age, or upstream exhaustion.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use conveyor_domain::{BatchSize, Interval, StreamError};

use crate::item::{Item, OpResult};
use crate::time::Clock;

const OPERATOR: &str = "batch";

struct Group<T> {
    elements: Vec<T>,
    started: Instant,
}

pub struct Batch<I, T, K, F> {
    upstream: I,
    size: BatchSize,
    interval: Interval,
    by: F,
    clock: Arc<dyn Clock>,
    groups: HashMap<K, Group<T>>,
    /// Keys in the order their group was first opened; the front is always
    /// the oldest open group.
    order: VecDeque<K>,
    pending_exception: Option<StreamError>,
    upstream_exhausted: bool,
}

impl<I, T, K, F> Batch<I, T, K, F>
where
    K: Eq + Hash + Clone,
{
    pub fn new(upstream: I, size: BatchSize, interval: Interval, by: F, clock: Arc<dyn Clock>) -> Self {
        Self {
            upstream,
            size,
            interval,
            by,
            clock,
            groups: HashMap::new(),
            order: VecDeque::new(),
            pending_exception: None,
            upstream_exhausted: false,
        }
    }

    fn append(&mut self, key: K, value: T) {
        if !self.groups.contains_key(&key) {
            let now = self.clock.now();
            self.order.push_back(key.clone());
            self.groups.insert(key.clone(), Group { elements: Vec::new(), started: now });
        }
        self.groups.get_mut(&key).expect("group just inserted").elements.push(value);
    }

    fn close(&mut self, key: &K) -> Vec<T> {
        self.order.retain(|k| k != key);
        self.groups.remove(key).map(|g| g.elements).unwrap_or_default()
    }

    fn key_reaching_size(&self) -> Option<K> {
        self.order
            .iter()
            .find(|k| self.size.is_reached(self.groups[*k].elements.len()))
            .cloned()
    }

    fn oldest_key_if_aged(&self) -> Option<K> {
        let key = self.order.front()?;
        let age = self.clock.now().duration_since(self.groups[key].started);
        self.interval.has_elapsed_since(age).then(|| key.clone())
    }

    fn discard_all_open_groups(&mut self) {
        self.groups.clear();
        self.order.clear();
    }
}

impl<I, T, K, F> Iterator for Batch<I, T, K, F>
where
    I: Iterator<Item = Item<T>>,
    K: Eq + Hash + Clone,
    F: FnMut(&T) -> OpResult<K>,
{
    type Item = Item<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.pending_exception.take() {
                return Some(Err(e));
            }

            if let Some(key) = self.key_reaching_size() {
                return Some(Ok(self.close(&key)));
            }

            if let Some(key) = self.oldest_key_if_aged() {
                return Some(Ok(self.close(&key)));
            }

            if self.upstream_exhausted {
                return match self.order.front().cloned() {
                    Some(key) => Some(Ok(self.close(&key))),
                    None => None,
                };
            }

            match self.upstream.next() {
                None => {
                    self.upstream_exhausted = true;
                }
                Some(Err(e)) => {
                    if let Some(key) = self.order.front().cloned() {
                        let group = self.close(&key);
                        self.discard_all_open_groups();
                        self.pending_exception = Some(e);
                        return Some(Ok(group));
                    }
                    return Some(Err(e));
                }
                Some(Ok(value)) => match (self.by)(&value) {
                    Err(e) => return Some(Err(StreamError::from_user_error(OPERATOR, e))),
                    Ok(key) => self.append(key, value),
                },
            }
        }
    }
}
