// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stream Error Model
//!
//! Error kinds raised while building or driving a [`conveyor`](../conveyor/index.html)
//! pipeline. The runtime distinguishes failures by *when* they occur:
//!
//! - **Build time**: [`StreamError::Parameter`] and [`StreamError::Source`] are raised
//!   eagerly, before any element is pulled.
//! - **Iteration time**: [`StreamError::Upstream`] and [`StreamError::UserFunction`] are
//!   surfaced at the position of the offending element, never truncating the stream.
//! - **Internal**: [`StreamError::EndOfIterationLeak`] and [`StreamError::Cancelled`] are
//!   runtime bookkeeping errors that should not normally reach an application, but are
//!   part of the public type so operators downstream (notably `catch`) can match on them.
//!
//! ## Error Categories
//!
//! | Kind | Raised when |
//! |---|---|
//! | `Parameter` | invalid operator configuration at construction |
//! | `Source` | the source factory produced something that cannot be iterated |
//! | `Upstream` | an upstream operator's error was captured and is being replayed in position |
//! | `UserFunction` | a user-supplied callable (`map`, `filter`, `by`, ...) raised |
//! | `EndOfIterationLeak` | a user callable raised the language's "no more items" signal from a non-source position |
//! | `Cancelled` | internal signal used to unwind worker pools on drop |

use std::fmt;

/// Boxed, thread-safe error payload carried by user-function and upstream failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by pipeline construction and iteration.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    /// Invalid operator configuration, rejected at build time.
    #[error("invalid parameter `{name}`: {reason}")]
    Parameter {
        name: &'static str,
        reason: String,
    },

    /// The source factory produced a value that could not be turned into an iterator,
    /// or a non-restartable iterable was materialized more than once.
    #[error("invalid source: {0}")]
    Source(String),

    /// An exception captured from the upstream side of a concurrent or flattening
    /// operator, replayed at the position it logically occurred.
    #[error("upstream failed: {0}")]
    Upstream(#[source] BoxError),

    /// A user-supplied callable (the function passed to `map`, `foreach`, `filter`,
    /// `by`, `when`, ...) raised.
    #[error("operator function failed: {0}")]
    UserFunction(#[source] BoxError),

    /// A user callable raised the language-native end-of-iteration signal from a
    /// position that is not a source. Honoring it silently would truncate the
    /// pipeline at the wrong point, so it is remapped to this distinct error kind.
    #[error("`{operator}` callable raised end-of-iteration; this is not a source and the signal is not honored")]
    EndOfIterationLeak { operator: &'static str },

    /// Internal signal used to unwind worker threads/tasks on drop. Never observed
    /// by a consumer that drives the iterator to completion.
    #[error("operator cancelled")]
    Cancelled,
}

impl StreamError {
    pub fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        StreamError::Parameter { name, reason: reason.into() }
    }

    pub fn source(reason: impl Into<String>) -> Self {
        StreamError::Source(reason.into())
    }

    pub fn user_function(err: impl Into<BoxError>) -> Self {
        StreamError::UserFunction(err.into())
    }

    pub fn upstream(err: impl Into<BoxError>) -> Self {
        StreamError::Upstream(err.into())
    }

    pub fn end_of_iteration_leak(operator: &'static str) -> Self {
        StreamError::EndOfIterationLeak { operator }
    }

    /// True for errors that indicate shutdown-in-progress rather than a genuine
    /// processing failure; `catch` never absorbs these.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StreamError::Cancelled)
    }
}

/// A minimal type tag used by `catch(kinds = ...)` to select which error kinds are
/// eligible for absorption without requiring `Eq` on the boxed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parameter,
    Source,
    Upstream,
    UserFunction,
    EndOfIterationLeak,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Parameter => "parameter",
            ErrorKind::Source => "source",
            ErrorKind::Upstream => "upstream",
            ErrorKind::UserFunction => "user_function",
            ErrorKind::EndOfIterationLeak => "end_of_iteration_leak",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A marker error a user-supplied callable may return to (mis)signal "no more
/// items", the way a foreign iterator adapter's `next()` might. Operators
/// downcast for this before treating a failure as an ordinary
/// [`StreamError::UserFunction`], so it can be remapped to
/// [`StreamError::EndOfIterationLeak`] instead of being misread as genuine
/// upstream exhaustion.
#[derive(Debug, Default, thiserror::Error)]
#[error("end of iteration signaled from within a non-source operator")]
pub struct EndOfIteration;

impl StreamError {
    /// Classify a user callable's error, detecting an [`EndOfIteration`] leak.
    pub fn from_user_error(operator: &'static str, err: BoxError) -> StreamError {
        if err.downcast_ref::<EndOfIteration>().is_some() {
            StreamError::end_of_iteration_leak(operator)
        } else {
            StreamError::UserFunction(err)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::Parameter { .. } => ErrorKind::Parameter,
            StreamError::Source(_) => ErrorKind::Source,
            StreamError::Upstream(_) => ErrorKind::Upstream,
            StreamError::UserFunction(_) => ErrorKind::UserFunction,
            StreamError::EndOfIterationLeak { .. } => ErrorKind::EndOfIterationLeak,
            StreamError::Cancelled => ErrorKind::Cancelled,
        }
    }
}
