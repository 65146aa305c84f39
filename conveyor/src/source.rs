// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source Adapter
//!
//! Normalizes a factory-or-iterable into the restartable iterator provider a
//! [`crate::Pipeline`] is rooted on. This is the "enhanced" variant: it
//! accepts a true factory (`Fn() -> I`, invoked fresh on every
//! materialization) as well as a directly-iterable value, which can only be
//! iterated once — a second materialization attempt fails with
//! [`StreamError::Source`] rather than silently yielding nothing.

use std::sync::Mutex;

use conveyor_domain::StreamError;

use crate::item::BoxIter;

/// Something that can produce a fresh upstream iterator on demand.
///
/// Implemented for `Fn() -> I` factories (restartable without limit) and, via
/// [`OnceIterable`], for a directly-supplied iterable (restartable exactly
/// once).
pub trait Source<T>: Send + Sync {
    fn materialize(&self) -> Result<BoxIter<T>, StreamError>;
}

/// A true factory: called exactly once per materialization, producing an
/// independent iterator each time. This is the only restartable-without-bound
/// source kind.
pub struct FactorySource<F> {
    factory: F,
}

impl<F, I, T> Source<T> for FactorySource<F>
where
    F: Fn() -> I + Send + Sync,
    I: Iterator<Item = T> + Send + 'static,
    T: Send + 'static,
{
    fn materialize(&self) -> Result<BoxIter<T>, StreamError> {
        Ok(Box::new((self.factory)().map(Ok)))
    }
}

pub fn from_factory<F, I, T>(factory: F) -> FactorySource<F>
where
    F: Fn() -> I + Send + Sync,
    I: Iterator<Item = T> + Send + 'static,
    T: Send + 'static,
{
    FactorySource { factory }
}

/// A directly-supplied iterable, consumable at most once. The invariant that
/// "the input factory is invoked exactly once per materialization" is
/// honored by rejecting a second attempt instead of silently reusing (and
/// exhausting) the same iterator.
pub struct OnceIterable<I> {
    inner: Mutex<Option<I>>,
}

impl<I, T> Source<T> for OnceIterable<I>
where
    I: Iterator<Item = T> + Send + 'static,
    T: Send + 'static,
{
    fn materialize(&self) -> Result<BoxIter<T>, StreamError> {
        let mut guard = self.inner.lock().expect("source mutex poisoned");
        match guard.take() {
            Some(iter) => Ok(Box::new(iter.map(Ok))),
            None => Err(StreamError::source(
                "this pipeline was built from a directly-iterable value, which can only be materialized once; wrap it in a factory to re-iterate",
            )),
        }
    }
}

pub fn from_iterable<II, T>(iterable: II) -> OnceIterable<II::IntoIter>
where
    II: IntoIterator<Item = T>,
    II::IntoIter: Send + 'static,
    T: Send + 'static,
{
    OnceIterable { inner: Mutex::new(Some(iterable.into_iter())) }
}

/// Wraps a fallible factory whose construction itself can fail (e.g. opening
/// a file) — the failure surfaces as [`StreamError::Source`] at the first
/// `next()` call rather than at pipeline-build time, matching the contract
/// that parameter errors are eager but source errors are not.
pub struct FallibleFactorySource<F> {
    factory: F,
}

impl<F, I, T> Source<T> for FallibleFactorySource<F>
where
    F: Fn() -> Result<I, StreamError> + Send + Sync,
    I: Iterator<Item = T> + Send + 'static,
    T: Send + 'static,
{
    fn materialize(&self) -> Result<BoxIter<T>, StreamError> {
        let iter = (self.factory)()?;
        Ok(Box::new(iter.map(Ok)))
    }
}

pub fn from_fallible_factory<F, I, T>(factory: F) -> FallibleFactorySource<F>
where
    F: Fn() -> Result<I, StreamError> + Send + Sync,
    I: Iterator<Item = T> + Send + 'static,
    T: Send + 'static,
{
    FallibleFactorySource { factory }
}

