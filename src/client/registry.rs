// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! In-flight request registry.
//!
//! Two views over the same set of live requests: a sequence-keyed map for
//! response demultiplexing, and a queue of sequences in registration order
//! for expiry scans. Deadlines are stamped inside [`Registry::register`],
//! with the registry lock held, so registration order is deadline order and
//! the queue's front is always the earliest deadline. Sequence allocation
//! order gives no such guarantee: a task can be descheduled between taking
//! its sequence and taking the lock, arriving here with a smaller sequence
//! than a request already registered. A claimed sequence leaves the map
//! immediately and lingers in the queue as a stale marker until it reaches
//! the front.

use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use bytes::Bytes;
use tokio::{sync::oneshot, time::Instant};

use crate::{client::error::ClientError, models::kind::FrameKind};

/// What a waiter observes when its request finishes: the response payload,
/// or the error that ended it.
pub type Completion = Result<Bytes, ClientError>;

/// One registered request awaiting a response, a timeout, or teardown.
#[derive(Debug)]
pub struct Inflight {
    pub seq: u32,
    pub kind: FrameKind,
    /// Absolute monotonic deadline after which the timeout task fails this
    /// request.
    pub deadline: Instant,
    done: oneshot::Sender<Completion>,
}

impl Inflight {
    fn new(
        seq: u32,
        kind: FrameKind,
        deadline: Instant,
        done: oneshot::Sender<Completion>,
    ) -> Self {
        Inflight {
            seq,
            kind,
            deadline,
            done,
        }
    }

    /// Deliver the outcome to the waiter. Consumes the record, so a second
    /// signal for the same request cannot be expressed. A waiter that
    /// already gave up is not an error.
    pub fn complete(self, outcome: Completion) {
        let _ = self.done.send(outcome);
    }
}

/// The set of live requests: looked up by sequence, expired front-first.
#[derive(Debug)]
pub struct Registry {
    timeout: Duration,
    by_seq: HashMap<u32, Inflight>,
    /// Sequences in registration order, stale markers included.
    order: VecDeque<u32>,
}

impl Registry {
    pub fn new(timeout: Duration) -> Self {
        Registry {
            timeout,
            by_seq: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Stamp the request's deadline and insert it into both views. The
    /// clock is read here, not by the caller, so a descheduled task cannot
    /// carry a stale timestamp into the queue and break its ordering.
    /// Returns the stamped deadline.
    pub fn register(
        &mut self,
        seq: u32,
        kind: FrameKind,
        done: oneshot::Sender<Completion>,
    ) -> Instant {
        let deadline = Instant::now() + self.timeout;
        debug_assert!(!self.by_seq.contains_key(&seq));
        self.by_seq.insert(seq, Inflight::new(seq, kind, deadline, done));
        self.order.push_back(seq);
        deadline
    }

    /// Remove and return the request for `seq`, conferring the exclusive
    /// right to complete it. `None` means the request already expired, was
    /// failed, or never existed. The queue keeps a stale marker.
    pub fn claim(&mut self, seq: u32) -> Option<Inflight> {
        self.by_seq.remove(&seq)
    }

    /// Remove and return every request whose deadline has passed. Stops at
    /// the first live entry; later entries cannot have expired earlier.
    pub fn drain_expired(&mut self, now: Instant) -> Vec<Inflight> {
        let mut expired = Vec::new();
        while let Some(&seq) = self.order.front() {
            let Some(entry) = self.by_seq.get(&seq) else {
                // Already claimed; drop the stale marker.
                self.order.pop_front();
                continue;
            };
            if entry.deadline > now {
                break;
            }
            self.order.pop_front();
            if let Some(entry) = self.by_seq.remove(&seq) {
                expired.push(entry);
            }
        }
        expired
    }

    /// Remove and return everything. Used only while tearing the
    /// connection down.
    pub fn drain_all(&mut self) -> Vec<Inflight> {
        self.order.clear();
        self.by_seq.drain().map(|(_, entry)| entry).collect()
    }

    /// Earliest deadline across live requests, if any. Drives the timeout
    /// task's sleep. Prunes stale markers it passes on the way.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(&seq) = self.order.front() {
            if let Some(entry) = self.by_seq.get(&seq) {
                return Some(entry.deadline);
            }
            self.order.pop_front();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.by_seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }
}
