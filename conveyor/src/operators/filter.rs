// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `filter`: yields upstream elements for which the predicate holds.

use conveyor_domain::StreamError;

use crate::item::{Item, OpResult};

const OPERATOR: &str = "filter";

pub struct Filter<I, F> {
    upstream: I,
    predicate: F,
}

impl<I, F> Filter<I, F> {
    pub fn new(upstream: I, predicate: F) -> Self {
        Self { upstream, predicate }
    }
}

impl<I, T, F> Iterator for Filter<I, F>
where
    I: Iterator<Item = Item<T>>,
    F: FnMut(&T) -> OpResult<bool>,
{
    type Item = Item<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.upstream.next()? {
                Err(e) => return Some(Err(e)),
                Ok(value) => match (self.predicate)(&value) {
                    Ok(true) => return Some(Ok(value)),
                    Ok(false) => continue,
                    Err(e) => return Some(Err(StreamError::from_user_error(OPERATOR, e))),
                },
            }
        }
    }
}
