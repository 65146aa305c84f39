// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Command-line surface for the `conveyor` demo binary: wires a handful of
//! pipeline stages onto lines of text read from a file or stdin, with
//! flags controlling the same knobs the library exposes (concurrency,
//! ordering, limit, batch size, rate).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use conveyor_domain::ExecutionMode;

/// CLI-facing mirror of [`ExecutionMode`], since clap needs its own
/// `ValueEnum` impl and the domain crate has no business depending on clap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Via {
    ThreadWorkers,
    CooperativeTasks,
}

impl From<Via> for ExecutionMode {
    fn from(via: Via) -> Self {
        match via {
            Via::ThreadWorkers => ExecutionMode::ThreadWorkers,
            Via::CooperativeTasks => ExecutionMode::CooperativeTasks,
        }
    }
}

/// Run a small demo stream pipeline over lines of input, counting each
/// line's length through `map`, `filter`, and optionally `batch`/`limit`/
/// `slow`.
#[derive(Debug, Parser)]
#[command(name = "conveyor", version, about)]
pub struct Cli {
    /// Input file to read lines from; reads stdin when omitted.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Worker count for the `map` stage. Falls back to config/env, then 1.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Preserve input order in `map`'s output (default: completion order).
    #[arg(long)]
    pub ordered: bool,

    /// Path to a TOML defaults file (falls back to `./conveyor.toml`).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Stop after this many elements.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Group output into tumbling batches of this size.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Cap the output rate to this many elements per second.
    #[arg(long)]
    pub per_second: Option<u32>,

    /// Emit debug-level logs.
    #[arg(short, long)]
    pub verbose: bool,

    /// Execution model for the `map` stage.
    #[arg(long, value_enum, default_value = "thread-workers")]
    pub via: Via,
}

pub fn parse() -> Cli {
    Cli::parse()
}
