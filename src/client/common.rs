// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::client::error::ClientError;

/// Run a socket I/O future with an upper bound on how long it may take,
/// aborting early if the connection is being torn down.
pub(super) async fn io_with_timeout<F, T>(
    label: &'static str,
    fut: F,
    io_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T, ClientError>
where
    F: Future<Output = std::io::Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(ClientError::Cancelled(label)),
        res = timeout(io_timeout, fut) => {
            match res {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(ClientError::Transport(e)),
                Err(_) => Err(ClientError::IoTimeout(label)),
            }
        }
    }
}

/// Run a socket I/O future with no time bound. The receive side waits for
/// the peer indefinitely; teardown is the only way out.
pub(super) async fn io_cancellable<F, T>(
    label: &'static str,
    fut: F,
    cancel: &CancellationToken,
) -> Result<T, ClientError>
where
    F: Future<Output = std::io::Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(ClientError::Cancelled(label)),
        res = fut => res.map_err(ClientError::Transport),
    }
}
