// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::io;

use thiserror::Error;

use crate::models::kind::FrameKind;

/// Errors surfaced by the block RPC client.
///
/// Per-request failures (`Remote`, `Timeout`, `InvalidArgument`) reach only
/// the originating caller. Transport failures collapse the connection and
/// every outstanding waiter observes `ConnectionClosed`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request kind is not one a caller may originate.
    #[error("invalid request kind {0}")]
    InvalidArgument(FrameKind),

    /// A request was submitted, or was still pending, while the connection
    /// was not open.
    #[error("connection is not open")]
    ConnectionClosed,

    /// The channel layer failed mid-frame. Always connection-fatal.
    #[error("transport failed: {0}")]
    Transport(#[from] io::Error),

    /// The wire contents could not be trusted.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The peer answered this request with an error frame.
    #[error("remote error: {0}")]
    Remote(String),

    /// The request exceeded its deadline while still registered.
    #[error("request timed out")]
    Timeout,

    /// The endpoint could not be reached within the configured retry budget.
    #[error("failed to connect after {attempts} attempts: {last}")]
    ConnectFailed { attempts: u32, last: io::Error },

    /// The socket path does not fit a `sockaddr_un`.
    #[error("socket path is too long: {0} bytes, limit is 107")]
    SocketPath(usize),

    /// An I/O wait was aborted by connection teardown.
    #[error("{0} cancelled")]
    Cancelled(&'static str),

    /// An I/O wait exceeded its bound.
    #[error("{0} timed out")]
    IoTimeout(&'static str),
}
