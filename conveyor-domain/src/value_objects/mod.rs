// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Small, validated parameter types shared by the pipeline builder and the
//! operator runtimes. Each type validates eagerly in its constructor so an
//! invalid pipeline configuration fails at build time, never mid-iteration.

mod batch_size;
mod concurrency;
mod delivery_order;
mod execution_mode;
mod interval;
mod rate;

pub use batch_size::BatchSize;
pub use concurrency::Concurrency;
pub use delivery_order::DeliveryOrder;
pub use execution_mode::ExecutionMode;
pub use interval::Interval;
pub use rate::PerSecond;
