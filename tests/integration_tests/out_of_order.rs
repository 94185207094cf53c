// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use blockrpc_client_rs::{client::client::ClientConnection, models::frame::Frame};
use bytes::Bytes;
use tokio::net::UnixListener;

use crate::integration_tests::common::{
    init_test_logger, quick_config, read_frame, temp_socket_path, write_frame,
};

/// Three reads outstanding at once; the peer answers them in a scrambled
/// order. Every waiter must still receive its own payload.
#[tokio::test]
async fn test_out_of_order_responses() -> Result<()> {
    init_test_logger();

    let path = temp_socket_path("ooo");
    let listener = UnixListener::bind(&path)?;

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");

        let mut requests = Vec::with_capacity(3);
        for _ in 0..3 {
            requests.push(read_frame(&mut stream).await.expect("request frame"));
        }

        // Answer in the order 2, 0, 1 relative to arrival. The payload is
        // derived from the request offset so each waiter can tell whether
        // it got somebody else's data.
        for idx in [2usize, 0, 1] {
            let req = &requests[idx];
            let len = req.header.length.get() as usize;
            let fill = (req.header.offset.get() / 16) as u8;
            let reply = Frame::response(req.seq(), Bytes::from(vec![fill; len]));
            write_frame(&mut stream, &reply).await.expect("reply");
        }
    });

    let conn = ClientConnection::connect(quick_config(&path)).await?;

    let mut buf_a = [0u8; 16];
    let mut buf_b = [0u8; 16];
    let mut buf_c = [0u8; 16];
    let (ra, rb, rc) = tokio::join!(
        conn.read_at(&mut buf_a, 16),
        conn.read_at(&mut buf_b, 32),
        conn.read_at(&mut buf_c, 48),
    );
    ra?;
    rb?;
    rc?;

    assert_eq!(buf_a, [1u8; 16]);
    assert_eq!(buf_b, [2u8; 16]);
    assert_eq!(buf_c, [3u8; 16]);

    conn.shutdown().await;
    peer.await?;
    let _ = std::fs::remove_file(&path);
    Ok(())
}
