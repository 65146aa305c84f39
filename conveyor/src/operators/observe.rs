// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `observe`: passes elements through while logging progress.

use crate::item::Item;
use crate::logging::ProgressLogger;

pub struct Observe<I> {
    upstream: I,
    logger: ProgressLogger,
    count: u64,
    finished: bool,
}

impl<I> Observe<I> {
    pub fn new(upstream: I, label: impl Into<String>) -> Self {
        Self { upstream, logger: ProgressLogger::new(label), count: 0, finished: false }
    }
}

impl<I, T> Iterator for Observe<I>
where
    I: Iterator<Item = Item<T>>,
{
    type Item = Item<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.upstream.next() {
            None => {
                if !self.finished {
                    self.finished = true;
                    if self.count > 0 {
                        self.logger.observe_final(self.count);
                    }
                }
                None
            }
            Some(Err(e)) => {
                self.count += 1;
                self.logger.observe_error(self.count, &e);
                Some(Err(e))
            }
            Some(Ok(value)) => {
                self.count += 1;
                self.logger.observe(self.count);
                Some(Ok(value))
            }
        }
    }
}
