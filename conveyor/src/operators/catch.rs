// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `catch`: absorbs matching upstream errors, optionally deferring the first
//! one to be re-raised once after exhaustion.

use std::collections::HashSet;

use conveyor_domain::{ErrorKind, StreamError};

use crate::item::Item;

pub struct Catch<I, T, R> {
    upstream: I,
    kinds: HashSet<ErrorKind>,
    when: Option<Box<dyn FnMut(&StreamError) -> bool + Send>>,
    replacement: Option<R>,
    finally_raise: bool,
    first_absorbed: Option<StreamError>,
    exhausted: bool,
    raised_final: bool,
    _marker: std::marker::PhantomData<T>,
}

impl<I, T, R> Catch<I, T, R> {
    /// `kinds` empty means "catch everything". `when` defaults to always-true
    /// when `None`. `replacement` is a factory rather than a bare value so a
    /// non-`Clone` `T` can still be substituted once per absorbed element.
    pub fn new(
        upstream: I,
        kinds: HashSet<ErrorKind>,
        when: Option<Box<dyn FnMut(&StreamError) -> bool + Send>>,
        replacement: Option<R>,
        finally_raise: bool,
    ) -> Self {
        Self {
            upstream,
            kinds,
            when,
            replacement,
            finally_raise,
            first_absorbed: None,
            exhausted: false,
            raised_final: false,
            _marker: std::marker::PhantomData,
        }
    }

    fn matches(&mut self, err: &StreamError) -> bool {
        if err.is_cancellation() {
            return false;
        }
        let kind_matches = self.kinds.is_empty() || self.kinds.contains(&err.kind());
        if !kind_matches {
            return false;
        }
        match self.when.as_mut() {
            Some(when) => when(err),
            None => true,
        }
    }
}

impl<I, T, R> Iterator for Catch<I, T, R>
where
    I: Iterator<Item = Item<T>>,
    R: FnMut() -> T,
{
    type Item = Item<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.raised_final {
                return None;
            }
            match self.upstream.next() {
                None => {
                    if !self.exhausted {
                        self.exhausted = true;
                        if self.finally_raise {
                            if let Some(err) = self.first_absorbed.take() {
                                self.raised_final = true;
                                return Some(Err(err));
                            }
                        }
                    }
                    return None;
                }
                Some(Ok(value)) => return Some(Ok(value)),
                Some(Err(err)) => {
                    if self.matches(&err) {
                        if self.finally_raise && self.first_absorbed.is_none() {
                            self.first_absorbed = Some(err);
                        }
                        if let Some(replacement) = self.replacement.as_mut() {
                            return Some(Ok(replacement()));
                        }
                        continue;
                    }
                    return Some(Err(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(msg: &'static str) -> Item<i32> {
        Err(StreamError::user_function(msg))
    }

    #[test]
    fn absorbs_without_replacement() {
        let upstream = vec![Ok(1), err("a"), Ok(2), err("b"), Ok(3)];
        let catch: Catch<_, i32, fn() -> i32> = Catch::new(upstream.into_iter(), HashSet::new(), None, None, false);
        let out: Vec<_> = catch.map(Result::unwrap).collect();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn yields_replacement_value() {
        let upstream = vec![Ok(1), err("a")];
        let catch = Catch::new(upstream.into_iter(), HashSet::new(), None, Some(|| -1), false);
        let out: Vec<_> = catch.map(Result::unwrap).collect();
        assert_eq!(out, vec![1, -1]);
    }

    #[test]
    fn finally_raise_defers_first_error_then_ends() {
        let upstream = vec![err("first"), err("second"), Ok(1), Ok(2)];
        let catch: Catch<_, i32, fn() -> i32> = Catch::new(upstream.into_iter(), HashSet::new(), None, None, true);
        let out: Vec<_> = catch.collect();
        assert_eq!(out.len(), 3);
        assert!(out[0].is_ok());
        assert!(out[1].is_ok());
        assert!(out[2].is_err());
        assert_eq!(out[2].as_ref().unwrap_err().to_string(), StreamError::user_function("first").to_string());
    }

    #[test]
    fn non_matching_kind_propagates() {
        let upstream: Vec<Item<i32>> = vec![Ok(1), Err(StreamError::parameter("x", "bad"))];
        let mut kinds = HashSet::new();
        kinds.insert(ErrorKind::UserFunction);
        let catch: Catch<_, i32, fn() -> i32> = Catch::new(upstream.into_iter(), kinds, None, None, false);
        let out: Vec<_> = catch.collect();
        assert!(out[0].is_ok());
        assert!(out[1].is_err());
    }
}
