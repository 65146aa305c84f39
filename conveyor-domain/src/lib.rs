// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Conveyor Domain
//!
//! Shared error model and validated parameter types for the `conveyor`
//! stream-processing runtime. This crate has no knowledge of iterators,
//! threads, or the pipeline builder itself — it only describes *what a valid
//! configuration looks like* and *what can go wrong*, so that both the
//! runtime crate and anything built on top of it agree on the same vocabulary.

pub mod error;
pub mod value_objects;

pub use error::{BoxError, EndOfIteration, ErrorKind, StreamError};
pub use value_objects::{BatchSize, Concurrency, DeliveryOrder, ExecutionMode, Interval, PerSecond};
