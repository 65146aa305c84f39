// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Demo entry point: reads lines of text and streams their lengths through
//! `conveyor`, exercising `map`, `filter`, `limit`, `slow`, `batch`, and
//! `observe` according to the flags in [`cli::Cli`].

mod cli;
mod config;
mod logger;

use std::io::Read;

use conveyor::source;
use conveyor::Pipeline;
use conveyor_domain::{BatchSize, Concurrency, DeliveryOrder, ExecutionMode, Interval, PerSecond};

fn read_lines(cli: &cli::Cli) -> anyhow::Result<Vec<String>> {
    let mut text = String::new();
    match &cli.input {
        Some(path) => {
            text = std::fs::read_to_string(path)?;
        }
        None => {
            std::io::stdin().lock().read_to_string(&mut text)?;
        }
    }
    Ok(text.lines().map(str::to_owned).collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::parse();
    let defaults = config::load(cli.config.as_deref())?;
    let verbose = cli.verbose || defaults.verbose.unwrap_or(false);
    logger::init(verbose);

    let lines = read_lines(&cli)?;
    tracing::info!(count = lines.len(), "read input lines");

    let concurrency_count = cli.concurrency.or(defaults.concurrency).unwrap_or(1);
    let concurrency = Concurrency::new(concurrency_count.max(1))?;
    let ordered = cli.ordered || defaults.ordered.unwrap_or(false);
    let order = if ordered { DeliveryOrder::Ordered } else { DeliveryOrder::Unordered };
    let limit = cli.limit.or(defaults.limit);
    let per_second = cli.per_second.or(defaults.per_second);
    let batch_size = cli.batch_size.or(defaults.batch_size);

    let via: ExecutionMode = cli.via.into();
    let mut lengths = match via {
        ExecutionMode::CooperativeTasks => Pipeline::from_source(source::from_iterable(lines))
            .amap(move |line: String| async move { Ok(line.len()) }, concurrency, order)
            .filter(|len: &usize| Ok(*len > 0))
            .observe("lines"),
        ExecutionMode::ThreadWorkers => Pipeline::from_source(source::from_iterable(lines))
            .map(|line: String| Ok(line.len()), concurrency, order)
            .filter(|len: &usize| Ok(*len > 0))
            .observe("lines"),
    };

    if let Some(when) = limit {
        lengths = lengths.limit(Some(when), None::<fn(&usize) -> conveyor::OpResult<bool>>)?;
    }

    if let Some(per_second) = per_second {
        lengths = lengths.slow(Some(PerSecond::new(per_second)?), None)?;
    }

    match batch_size {
        None => {
            for item in lengths.iter()? {
                match item {
                    Ok(len) => println!("{len}"),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
        }
        Some(size) => {
            let batched = lengths.batch(BatchSize::bounded(size)?, Interval::unbounded());
            for item in batched.iter()? {
                match item {
                    Ok(group) => println!("{group:?}"),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
        }
    }

    Ok(())
}
