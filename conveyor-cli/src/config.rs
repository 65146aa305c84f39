// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Bootstrap-phase defaults for the demo binary, layered from an optional
//! TOML file and `CONVEYOR_*` environment variables before CLI flags are
//! applied on top. Mirrors the library's own builder-then-validate shape:
//! this struct holds raw, unvalidated values — [`crate::cli::Cli`] decides
//! the final settings and the library's value objects do the validating.

use serde::Deserialize;

/// Defaults read from `conveyor.toml` (if present) and the `CONVEYOR_`
/// environment prefix. Every field is optional: CLI flags always win, and a
/// missing config source just means these all stay `None`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct FileDefaults {
    pub concurrency: Option<usize>,
    pub ordered: Option<bool>,
    pub limit: Option<usize>,
    pub batch_size: Option<usize>,
    pub per_second: Option<u32>,
    pub verbose: Option<bool>,
}

/// Loads [`FileDefaults`] from `path` (defaulting to `conveyor.toml` in the
/// current directory) merged with `CONVEYOR_*` environment variables. Absent
/// sources are silently skipped; a malformed present source is an error.
pub fn load(path: Option<&std::path::Path>) -> anyhow::Result<FileDefaults> {
    let file = path.map(std::path::Path::to_path_buf).unwrap_or_else(|| std::path::PathBuf::from("conveyor.toml"));

    let builder = config::Config::builder()
        .add_source(config::File::from(file).required(false))
        .add_source(config::Environment::with_prefix("CONVEYOR"));

    let settings = builder.build()?;
    Ok(settings.try_deserialize()?)
}
