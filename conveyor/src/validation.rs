// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Cross-cutting parameter validation for builder methods that combine more
//! than one [`conveyor_domain`] value object — checks that no single value
//! object can enforce alone (e.g. "at least one of two optional knobs is
//! required").

use std::time::Duration;

use conveyor_domain::{Interval, PerSecond, StreamError};

/// `limit`/`truncate` requires a count, a stopping predicate, or both.
pub fn validate_limit(count: Option<usize>, has_when: bool) -> Result<(), StreamError> {
    if count.is_none() && !has_when {
        return Err(StreamError::parameter("limit", "at least one of `count` or `when` is required"));
    }
    Ok(())
}

/// `slow`/`throttle` requires `per_second`, `interval`, or both; the minimum
/// gap the operator enforces is the more restrictive of the two.
pub fn validate_slow(per_second: Option<PerSecond>, interval: Option<Interval>) -> Result<Duration, StreamError> {
    if per_second.is_none() && interval.is_none() {
        return Err(StreamError::parameter("slow", "at least one of `per_second` or `interval` is required"));
    }
    let from_rate = per_second.map(PerSecond::min_gap).unwrap_or(Duration::ZERO);
    let from_interval = interval.and_then(Interval::as_duration).unwrap_or(Duration::ZERO);
    Ok(from_rate.max(from_interval))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_rejects_neither_count_nor_when() {
        assert!(validate_limit(None, false).is_err());
        assert!(validate_limit(Some(1), false).is_ok());
        assert!(validate_limit(None, true).is_ok());
    }

    #[test]
    fn slow_rejects_neither_rate_nor_interval() {
        assert!(validate_slow(None, None).is_err());
        assert!(validate_slow(Some(PerSecond::new(10).unwrap()), None).is_ok());
    }

    #[test]
    fn slow_picks_the_more_restrictive_gap() {
        let gap = validate_slow(Some(PerSecond::new(10).unwrap()), Some(Interval::bounded(Duration::from_millis(500)).unwrap())).unwrap();
        assert_eq!(gap, Duration::from_millis(500));
    }
}
