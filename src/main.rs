// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result, ensure};
use blockrpc_client_rs::{
    cfg::{cli::config_path_from_env, config::Config, logger::init_logger},
    client::client::ClientConnection,
};
use rand::RngExt;
use tracing::info;

/// Smoke driver: connect to the configured endpoint, push one block through
/// a write/read round trip, and tear the connection down.
#[tokio::main]
async fn main() -> Result<()> {
    let _init_logger = init_logger("tests/config_logger.yaml")?;

    let cfg = config_path_from_env("tests/config.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let conn = ClientConnection::connect(cfg)
        .await
        .context("failed to open client connection")?;
    info!("Endpoint is reachable");

    let mut payload = vec![0u8; 4096];
    rand::rng().fill(&mut payload[..]);

    conn.write_at(&payload, 0).await.context("write_at failed")?;

    let mut readback = vec![0u8; payload.len()];
    conn.read_at(&mut readback, 0).await.context("read_at failed")?;
    ensure!(readback == payload, "read back different data than written");
    info!("Round trip verified");

    conn.shutdown().await;
    Ok(())
}
