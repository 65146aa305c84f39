// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Logarithmic progress logger backing the `observe` operator.
//!
//! Logging every element would drown useful signal in noise for
//! high-throughput pipelines, so `observe` logs on a logarithmic schedule:
//! counts 1, 2, 4, 8, ... and, if the final count is not itself a power of
//! two, one closing log line on exhaustion.

use conveyor_domain::StreamError;

fn is_power_of_two_or_one(n: u64) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

/// Emits `tracing` events for an `observe` operator instance under a
/// caller-supplied label.
pub struct ProgressLogger {
    label: String,
}

impl ProgressLogger {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    /// Called after each successfully-yielded element. Logs only when `count`
    /// is a power of two (or 1).
    pub fn observe(&self, count: u64) {
        if is_power_of_two_or_one(count) {
            tracing::info!(target: "conveyor::observe", label = %self.label, count, "progress");
        }
    }

    /// Called once after upstream exhaustion. Emits a closing line only if
    /// the terminal count was not already logged by `observe`.
    pub fn observe_final(&self, count: u64) {
        if !is_power_of_two_or_one(count) {
            tracing::info!(target: "conveyor::observe", label = %self.label, count, final = true, "progress");
        }
    }

    /// Called when an upstream error passes through; logged with full
    /// context before the error continues downstream.
    pub fn observe_error(&self, count: u64, err: &StreamError) {
        tracing::warn!(
            target: "conveyor::observe",
            label = %self.label,
            count,
            error = %err,
            "error observed"
        );
    }
}
