// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Bootstrap-phase logging setup, separate from the library's own `tracing`
//! call sites — this only configures the process-wide subscriber once, at
//! startup.

/// Installs a `tracing-subscriber` formatter honoring `RUST_LOG`, defaulting
/// to `info` when unset. Safe to call at most once per process; a second
/// call is a logic error in the caller, not a recoverable condition.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
