// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use std::num::NonZeroU32;

use crate::error::StreamError;

/// A leaky-bucket cap of yields per wall-clock second, `>= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerSecond(NonZeroU32);

impl PerSecond {
    pub fn new(value: u32) -> Result<Self, StreamError> {
        NonZeroU32::new(value)
            .map(PerSecond)
            .ok_or_else(|| StreamError::parameter("per_second", "must be >= 1"))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Minimum spacing between yields implied by this rate.
    pub fn min_gap(self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.get() as f64)
    }
}
