// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Locate the client's YAML config. The `BLOCKRPC_CONFIG` environment
/// variable wins; otherwise `default_rel`, anchored at the working
/// directory when relative. The file must exist: the path is canonicalized
/// before it is handed to the loader.
pub fn config_path_from_env(default_rel: &str) -> Result<PathBuf> {
    let picked =
        std::env::var("BLOCKRPC_CONFIG").unwrap_or_else(|_| default_rel.to_string());

    let p = PathBuf::from(&picked);
    let abs = if p.is_absolute() {
        p
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(p)
    };

    abs.canonicalize()
        .with_context(|| format!("failed to canonicalize config path {picked:?}"))
}
