// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use bytes::BytesMut;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        UnixStream,
        unix::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex,
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{
    client::{
        common::{io_cancellable, io_with_timeout},
        error::ClientError,
    },
    models::frame::{Frame, FrameHeader, HEADER_LEN, MAX_DATA_LEN},
};

/// Owns the stream endpoint. The writer mutex serialises outbound framing
/// and is held for the duration of one frame only; the read half has a
/// single consumer (the reader task), its mutex exists to keep the type
/// shareable behind `Arc`.
#[derive(Debug)]
pub struct Transport {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
}

impl Transport {
    pub fn new(stream: UnixStream) -> Self {
        let (r, w) = stream.into_split();
        Transport {
            reader: Mutex::new(r),
            writer: Mutex::new(w),
        }
    }

    /// Emit one frame. Any partial write surfaces as `Transport` and the
    /// caller must treat the connection as dead.
    pub async fn send(
        &self,
        frame: &Frame,
        io_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        let mut header_buf = [0u8; HEADER_LEN];
        frame
            .header
            .to_wire_bytes(&mut header_buf)
            .map_err(|e| ClientError::Protocol(e.to_string()))?;

        let mut w = self.writer.lock().await;
        trace!(seq = frame.seq(), "send frame");
        io_with_timeout(
            "write frame header",
            w.write_all(&header_buf),
            io_timeout,
            cancel,
        )
        .await?;
        if !frame.payload.is_empty() {
            io_with_timeout(
                "write frame payload",
                w.write_all(&frame.payload),
                io_timeout,
                cancel,
            )
            .await?;
        }
        Ok(())
    }

    /// Block until one full frame arrives. Payload storage is allocated
    /// here and handed to the caller. Returns `Cancelled` once teardown
    /// begins and `Transport` when the peer goes away mid-frame.
    pub async fn receive(&self, cancel: &CancellationToken) -> Result<Frame, ClientError> {
        let mut r = self.reader.lock().await;

        let mut header_buf = [0u8; HEADER_LEN];
        io_cancellable("read frame header", r.read_exact(&mut header_buf), cancel)
            .await?;
        let header = FrameHeader::from_wire_bytes(&header_buf)
            .map_err(|e| ClientError::Protocol(e.to_string()))?;

        let data_len = header.data_length.get() as usize;
        if data_len > MAX_DATA_LEN {
            return Err(ClientError::Protocol(format!(
                "inbound payload of {data_len} bytes exceeds the {MAX_DATA_LEN} limit"
            )));
        }

        let mut payload = BytesMut::zeroed(data_len);
        if data_len > 0 {
            io_cancellable("read frame payload", r.read_exact(&mut payload), cancel)
                .await?;
        }

        trace!(seq = header.seq.get(), "received frame");
        Ok(Frame {
            header,
            payload: payload.freeze(),
        })
    }

    /// Half-close the write side so the peer sees EOF. Errors are ignored,
    /// the socket may already be gone.
    pub async fn half_close(&self) {
        let mut w = self.writer.lock().await;
        let _ = w.shutdown().await;
    }
}
