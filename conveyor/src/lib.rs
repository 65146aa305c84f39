// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A lazy, composable stream-processing pipeline over pull-based iterators.
//!
//! A [`Pipeline<T>`] is an immutable chain of operator descriptors rooted at
//! a [`Source`]. Nothing runs until [`Pipeline::iter`] materializes the
//! chain into a single-pass [`Iterator`] of [`Item<T>`] — `Ok(value)` or the
//! [`StreamError`] raised at that position. Re-materializing a pipeline
//! (calling `.iter()` again) re-invokes the source and is independent of any
//! prior materialization.
//!
//! ```
//! use conveyor::{source, Pipeline};
//! use conveyor_domain::{Concurrency, DeliveryOrder};
//!
//! let pipeline = Pipeline::from_source(source::from_iterable(0..5))
//!     .map(|v: i32| Ok(v * v), Concurrency::new(4).unwrap(), DeliveryOrder::Ordered)
//!     .filter(|v: &i32| Ok(v % 2 == 0));
//!
//! let out: Vec<i32> = pipeline.iter().unwrap().map(Result::unwrap).collect();
//! assert_eq!(out, vec![0, 4, 16]);
//! ```
//!
//! Every operator surfaces exceptions at the position they occurred, rather
//! than unwinding the whole pipeline — see [`Item`] and [`StreamError`].

pub mod item;
pub mod logging;
pub mod operators;
pub mod pipeline;
pub mod source;
pub mod time;
pub mod validation;

pub use conveyor_domain::{BatchSize, Concurrency, DeliveryOrder, ErrorKind, Interval, PerSecond, StreamError};
pub use item::{BoxIter, Item, OpResult};
pub use pipeline::Pipeline;
