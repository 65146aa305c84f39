// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Core type aliases shared across the operator runtimes.

use conveyor_domain::{BoxError, StreamError};

/// An element flowing through a materialized pipeline: either the value
/// itself, or the [`StreamError`] raised at that position. Iteration
/// continues past an `Err` unless the producing operator is sticky-terminal
/// (`limit`, a non-deferred `catch` that re-raises once, ...).
pub type Item<T> = Result<T, StreamError>;

/// A boxed, single-pass, restartable-by-recreation iterator. This is the
/// concrete shape every operator wraps its upstream in and the shape a
/// [`crate::Pipeline`] materializes to.
pub type BoxIter<T> = Box<dyn Iterator<Item = Item<T>> + Send>;

/// The return type of a fallible, user-supplied operator callable (`map`'s
/// transform, `filter`'s predicate, `batch`'s keying function, ...). A
/// callable may return [`conveyor_domain::EndOfIteration`] as its error to
/// (mis)signal "no more items" from a non-source position; the runtime
/// detects this and remaps it to [`StreamError::EndOfIterationLeak`] instead
/// of either crashing or silently truncating the pipeline.
pub type OpResult<U> = Result<U, BoxError>;
