// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use anyhow::Result;
use blockrpc_client_rs::client::{client::ClientConnection, error::ClientError};
use serial_test::serial;
use tokio::net::UnixListener;

use crate::integration_tests::common::{
    init_test_logger, quick_config, spawn_echo_peer, temp_socket_path,
};

#[tokio::test]
async fn test_connect_fails_after_retry_budget() -> Result<()> {
    init_test_logger();

    // Nothing ever listens here.
    let path = temp_socket_path("nobody");
    let res = ClientConnection::connect(quick_config(&path)).await;

    assert!(
        matches!(res, Err(ClientError::ConnectFailed { attempts: 3, .. })),
        "expected ConnectFailed after the whole budget"
    );
    Ok(())
}

/// The endpoint shows up while the client is still retrying.
#[tokio::test]
#[serial]
async fn test_connect_succeeds_on_retry() -> Result<()> {
    init_test_logger();

    let path = temp_socket_path("latecomer");
    let bind_path = path.clone();
    let late_peer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let listener = UnixListener::bind(&bind_path).expect("bind");
        spawn_echo_peer(listener).await.expect("peer");
    });

    let conn = ClientConnection::connect(quick_config(&path)).await?;
    assert!(conn.is_open().await);

    conn.shutdown().await;
    late_peer.await?;
    let _ = std::fs::remove_file(&path);
    Ok(())
}
