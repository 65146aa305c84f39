// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `slow` / `throttle`: caps the rate at which elements are yielded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::item::Item;
use crate::time::Clock;

pub struct Slow<I> {
    upstream: I,
    min_gap: Duration,
    last_yield: Option<Instant>,
    clock: Arc<dyn Clock>,
}

impl<I> Slow<I> {
    /// `min_gap` is the more restrictive of `per_second` and `interval`,
    /// computed by the builder (at least one of the two is required).
    pub fn new(upstream: I, min_gap: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { upstream, min_gap, last_yield: None, clock }
    }
}

impl<I, T> Iterator for Slow<I>
where
    I: Iterator<Item = Item<T>>,
{
    type Item = Item<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.upstream.next()?;

        let now = self.clock.now();
        if let Some(last) = self.last_yield {
            let elapsed = now.duration_since(last);
            if elapsed < self.min_gap {
                // Sleep measured from the previous yield; an upstream that was
                // already slower than the limit never sleeps here (no burst
                // catch-up for the gap already spent).
                self.clock.sleep(self.min_gap - elapsed);
            }
        }
        self.last_yield = Some(self.clock.now());
        Some(item)
    }
}
