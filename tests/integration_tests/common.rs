// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared plumbing for the scripted in-process peers the integration tests
//! talk to.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use anyhow::Result;
use blockrpc_client_rs::{
    cfg::{config::Config, logger::init_logger},
    models::{
        frame::{Frame, FrameHeader, HEADER_LEN},
        kind::FrameKind,
    },
};
use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    task::JoinHandle,
};

static SOCKET_SEQ: AtomicU32 = AtomicU32::new(0);

pub fn init_test_logger() {
    // Only the first test to get here installs the subscriber.
    let _ = init_logger("tests/config_logger.yaml");
}

/// A unique socket path per test so suites can run in parallel.
pub fn temp_socket_path(tag: &str) -> PathBuf {
    let n = SOCKET_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("blockrpc-{tag}-{}-{n}.sock", std::process::id()))
}

/// Client config pointed at `path` with a small retry budget so failures
/// surface quickly.
pub fn quick_config(path: &Path) -> Config {
    let mut cfg = Config::for_socket_path(path.to_string_lossy());
    cfg.connection.retry_interval = Duration::from_millis(100);
    cfg.connection.retry_counts = 3;
    cfg
}

/// Peer-side frame receive.
pub async fn read_frame(stream: &mut UnixStream) -> Result<Frame> {
    let mut header_buf = [0u8; HEADER_LEN];
    stream.read_exact(&mut header_buf).await?;
    let header = FrameHeader::from_wire_bytes(&header_buf)?;

    let len = header.data_length.get() as usize;
    let mut payload = BytesMut::zeroed(len);
    if len > 0 {
        stream.read_exact(&mut payload).await?;
    }
    Ok(Frame {
        header,
        payload: payload.freeze(),
    })
}

/// Peer-side frame send.
pub async fn write_frame(stream: &mut UnixStream, frame: &Frame) -> Result<()> {
    let mut header_buf = [0u8; HEADER_LEN];
    frame.header.to_wire_bytes(&mut header_buf)?;
    stream.write_all(&header_buf).await?;
    if !frame.payload.is_empty() {
        stream.write_all(&frame.payload).await?;
    }
    Ok(())
}

/// A loopback storage peer: writes land in a sparse in-memory store keyed by
/// offset, reads return what was written there (zeroes otherwise). Serves a
/// single connection until the client goes away.
pub fn spawn_echo_peer(listener: UnixListener) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let mut store: HashMap<u64, Vec<u8>> = HashMap::new();

        while let Ok(frame) = read_frame(&mut stream).await {
            let seq = frame.seq();
            let offset = frame.header.offset.get();
            let reply = match frame.frame_kind() {
                Ok(FrameKind::Write) => {
                    store.insert(offset, frame.payload.to_vec());
                    Frame::response(seq, Bytes::new())
                },
                Ok(FrameKind::Read) => {
                    let len = frame.header.length.get() as usize;
                    let data = store
                        .get(&offset)
                        .cloned()
                        .unwrap_or_else(|| vec![0u8; len]);
                    Frame::response(seq, Bytes::from(data))
                },
                _ => continue,
            };
            if write_frame(&mut stream, &reply).await.is_err() {
                break;
            }
        }
    })
}
