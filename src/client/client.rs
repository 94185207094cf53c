// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The client connection.
//!
//! Many callers issue blocking `read_at` / `write_at` operations against one
//! shared connection. Each request is tagged with a fresh sequence number and
//! parked in the registry; a dedicated reader task matches inbound response
//! frames to waiters, and a dedicated timeout task fails requests whose
//! deadline passes first. Whoever removes a request from the registry owns
//! the sole right to complete it, so every waiter is woken exactly once.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use bytes::Bytes;
use tokio::{
    net::UnixStream,
    sync::{Mutex, Notify, oneshot},
    time::{Instant, sleep, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    cfg::config::Config,
    client::{error::ClientError, registry::Registry, transport::Transport},
    models::{frame::Frame, kind::FrameKind},
};

/// Longest socket path a `sockaddr_un` can carry while leaving room for the
/// terminating byte.
pub const MAX_SOCKET_PATH: usize = 107;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Open,
    Closed,
}

/// A single block RPC connection over a Unix stream socket.
///
/// Created by [`ClientConnection::connect`]; torn down exactly once by
/// [`ClientConnection::shutdown`], which the reader also triggers on any
/// receive error or EOF. After shutdown no new requests are admitted and
/// every pending waiter observes a failure.
#[derive(Debug)]
pub struct ClientConnection {
    transport: Transport,
    cfg: Config,
    /// Open until the first shutdown, then Closed forever.
    state: Mutex<ConnState>,
    registry: Mutex<Registry>,
    /// Pinged after every registry mutation so the timeout task re-reads
    /// the head deadline.
    rearm: Notify,
    seq_counter: AtomicU32,
    /// Connection-wide kill switch: unblocks the reader's receive and the
    /// timeout task's sleep.
    cancel: CancellationToken,
}

impl ClientConnection {
    /// Connect to the endpoint at `cfg.connection.socket_path`, retrying up
    /// to the configured attempt budget, and spawn the reader and timeout
    /// tasks.
    pub async fn connect(cfg: Config) -> Result<Arc<Self>, ClientError> {
        let path = cfg.connection.socket_path.clone();
        if path.len() > MAX_SOCKET_PATH {
            return Err(ClientError::SocketPath(path.len()));
        }

        let stream = Self::connect_with_retry(&path, &cfg).await?;
        let request_timeout = cfg.connection.request_timeout;

        let conn = Arc::new(Self {
            transport: Transport::new(stream),
            cfg,
            state: Mutex::new(ConnState::Open),
            registry: Mutex::new(Registry::new(request_timeout)),
            rearm: Notify::new(),
            seq_counter: AtomicU32::new(0),
            cancel: CancellationToken::new(),
        });

        let reader = Arc::clone(&conn);
        tokio::spawn(async move {
            if let Err(e) = reader.read_loop().await {
                if matches!(e, ClientError::Cancelled(_)) {
                    debug!("read loop exited: {e}");
                } else {
                    warn!("read loop exited: {e}");
                }
            }
        });

        let watcher = Arc::clone(&conn);
        tokio::spawn(async move {
            watcher.timeout_loop().await;
        });

        Ok(conn)
    }

    async fn connect_with_retry(
        path: &str,
        cfg: &Config,
    ) -> Result<UnixStream, ClientError> {
        let attempts = cfg.connection.retry_counts;
        let mut last = None;
        for attempt in 1..=attempts {
            match UnixStream::connect(path).await {
                Ok(stream) => {
                    if attempt > 1 {
                        info!(attempt, path, "connected after retry");
                    }
                    return Ok(stream);
                },
                Err(e) => {
                    warn!(attempt, path, error = %e, "cannot connect, retrying");
                    last = Some(e);
                },
            }
            if attempt < attempts {
                sleep(cfg.connection.retry_interval).await;
            }
        }
        Err(ClientError::ConnectFailed {
            attempts,
            last: last.unwrap_or_else(|| {
                std::io::Error::other("retry budget was zero attempts")
            }),
        })
    }

    /// Read `buf.len()` bytes at `offset`. The buffer is zeroed first so a
    /// short response leaves defined contents.
    pub async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), ClientError> {
        buf.fill(0);
        let payload = self
            .process_request(FrameKind::Read, Bytes::new(), offset, buf.len() as u32)
            .await?;
        let n = payload.len().min(buf.len());
        buf[..n].copy_from_slice(&payload[..n]);
        Ok(())
    }

    /// Write `buf` at `offset`.
    pub async fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), ClientError> {
        self.process_request(
            FrameKind::Write,
            Bytes::copy_from_slice(buf),
            offset,
            buf.len() as u32,
        )
        .await?;
        Ok(())
    }

    /// Submit one request and wait for its completion.
    ///
    /// Registration happens before the frame is sent, and the completion
    /// channel exists before registration, so a response racing ahead of
    /// this task's own send cannot be lost. On a send failure the request
    /// is claimed back out of the registry before the error surfaces, and
    /// the connection is torn down: a partial frame leaves the stream
    /// unusable.
    pub async fn process_request(
        &self,
        kind: FrameKind,
        payload: Bytes,
        offset: u64,
        length: u32,
    ) -> Result<Bytes, ClientError> {
        if !self.is_open().await {
            warn!("cannot queue more requests, connection is not open");
            return Err(ClientError::ConnectionClosed);
        }
        if !kind.is_request() {
            return Err(ClientError::InvalidArgument(kind));
        }

        let seq = self.seq_counter.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = oneshot::channel();
        {
            // The registry stamps the deadline under its own lock; carrying
            // a timestamp across the lock boundary would let a descheduled
            // task register out of deadline order.
            let mut registry = self.registry.lock().await;
            registry.register(seq, kind, tx);
        }
        self.rearm.notify_one();

        let frame = Frame::request(kind, seq, offset, length, payload);
        if let Err(e) = self
            .transport
            .send(&frame, self.cfg.runtime.timeout_connection, &self.cancel)
            .await
        {
            let _ = self.registry.lock().await.claim(seq);
            self.rearm.notify_one();
            warn!(seq, error = %e, "send failed, tearing the connection down");
            self.shutdown().await;
            return Err(e);
        }

        tokio::select! {
            res = &mut rx => res.unwrap_or(Err(ClientError::ConnectionClosed)),
            _ = self.cancel.cancelled() => {
                // Teardown raced this request. A registration that slipped
                // in after the shutdown drain must be reclaimed here;
                // otherwise whoever claimed it has signalled already.
                if let Some(entry) = self.registry.lock().await.claim(seq) {
                    entry.complete(Err(ClientError::ConnectionClosed));
                }
                rx.await.unwrap_or(Err(ClientError::ConnectionClosed))
            },
        }
    }

    /// Single consumer of the receive side. Demultiplexes responses to
    /// waiters until the peer disappears, then initiates teardown.
    async fn read_loop(self: Arc<Self>) -> Result<(), ClientError> {
        let result = loop {
            let frame = match self.transport.receive(&self.cancel).await {
                Ok(frame) => frame,
                Err(e) => break Err(e),
            };

            let kind = match frame.frame_kind() {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(seq = frame.seq(), "{e}, dropping frame");
                    continue;
                },
            };

            match kind {
                FrameKind::Eof => {
                    info!("received EOF, about to end the connection");
                    break Ok(());
                },
                FrameKind::Read | FrameKind::Write => {
                    warn!(
                        seq = frame.seq(),
                        kind = %kind,
                        "request kind on an inbound frame, dropping"
                    );
                    continue;
                },
                FrameKind::Error | FrameKind::Response => {
                    self.deliver(kind, frame).await;
                },
            }
        };
        self.shutdown().await;
        result
    }

    /// Hand one inbound frame to its waiter. A frame whose sequence is no
    /// longer registered lost the race against expiry or teardown and is
    /// dropped.
    async fn deliver(&self, kind: FrameKind, frame: Frame) {
        let seq = frame.seq();
        let claimed = self.registry.lock().await.claim(seq);
        let Some(entry) = claimed else {
            debug!(seq, "response for an unknown sequence, dropping");
            return;
        };
        self.rearm.notify_one();

        if kind == FrameKind::Error {
            let reason = String::from_utf8_lossy(&frame.payload).into_owned();
            warn!(seq, %reason, "received error for request");
            entry.complete(Err(ClientError::Remote(reason)));
        } else {
            entry.complete(Ok(frame.payload));
        }
    }

    /// Single consumer of the expiry timer. Sleeps until the registry's
    /// earliest deadline, wakes on rearm, and fails whatever has expired.
    async fn timeout_loop(self: Arc<Self>) {
        loop {
            let next = self.registry.lock().await.next_deadline();
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.rearm.notified() => continue,
                _ = Self::sleep_until_deadline(next) => {},
            }

            let now = Instant::now();
            let expired = self.registry.lock().await.drain_expired(now);
            for entry in expired {
                warn!(seq = entry.seq, "request timed out");
                entry.complete(Err(ClientError::Timeout));
            }
        }
    }

    async fn sleep_until_deadline(next: Option<Instant>) {
        match next {
            Some(deadline) => sleep_until(deadline).await,
            // Disarmed until a registration pings the rearm signal.
            None => std::future::pending::<()>().await,
        }
    }

    pub async fn is_open(&self) -> bool {
        *self.state.lock().await == ConnState::Open
    }

    /// Number of requests currently awaiting a response or expiry.
    pub async fn pending_requests(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Tear the connection down. Idempotent; safe to call from the reader,
    /// from callers, or from both concurrently. Fails every pending waiter,
    /// so nobody stays blocked past this point.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.lock().await;
            if *state == ConnState::Closed {
                return;
            }
            *state = ConnState::Closed;
        }
        info!("shutting down connection");

        self.cancel.cancel();
        self.transport.half_close().await;

        let drained = self.registry.lock().await.drain_all();
        for entry in drained {
            warn!(seq = entry.seq, "cancelling request due to disconnection");
            entry.complete(Err(ClientError::ConnectionClosed));
        }
        info!("shutdown complete");
    }
}
