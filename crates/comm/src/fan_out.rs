// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out broadcaster.
//!
//! Holds a dynamic set of downstream senders. A broadcast encodes the message
//! once and queues the same bytes for every sender present when the broadcast
//! began. Each sender has its own writer task draining its queue in order, so
//! a broadcast never waits on a peer's socket: one slow or stuck peer does
//! not hold up the others, and a failing peer does not stop delivery to the
//! rest.
//!
//! A write failure is recorded by the writer and reported by the next
//! [`send_frame`](Sender::send_frame) or [`flush`](FanOutSender::flush).

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use drover_wire::Frame;
use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{BroadcastError, CommunicationError};
use crate::sender::Sender;

/// How long shutdown waits for a sender's queue to drain.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Frames a sender may have queued before it counts as failed.
pub const DEFAULT_MAX_BACKLOG: usize = 4096;

/// Handle returned by [`FanOutSender::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SenderId(u64);

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sender-{}", self.0)
    }
}

enum Item {
    Frame(Frame),
    Flush(oneshot::Sender<()>),
}

/// The broadcasting side of one member's writer.
#[derive(Clone)]
struct Queue {
    id: SenderId,
    items: mpsc::UnboundedSender<Item>,
    backlog: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<CommunicationError>>>,
}

struct Member {
    queue: Queue,
    sender: Arc<dyn Sender>,
    writer: JoinHandle<()>,
}

struct Members {
    members: Vec<Member>,
    closed: bool,
}

pub struct FanOutSender {
    members: Mutex<Members>,
    next_id: AtomicU64,
    drain_timeout: Duration,
    max_backlog: usize,
}

impl Default for FanOutSender {
    fn default() -> Self {
        Self::new()
    }
}

impl FanOutSender {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(Members { members: Vec::new(), closed: false }),
            next_id: AtomicU64::new(1),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            max_backlog: DEFAULT_MAX_BACKLOG,
        }
    }

    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn max_backlog(mut self, frames: usize) -> Self {
        self.max_backlog = frames;
        self
    }

    /// Register a sender and start its writer. It receives every broadcast
    /// that starts after this call returns.
    ///
    /// Senders added after [`shutdown`](Sender::shutdown) are never written.
    pub fn add(&self, sender: Arc<dyn Sender>) -> SenderId {
        let id = SenderId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut members = self.members.lock();
        if members.closed {
            debug!("{} added after shutdown, ignoring", id);
            return id;
        }
        let (items, rx) = mpsc::unbounded_channel();
        let queue = Queue {
            id,
            items,
            backlog: Arc::new(AtomicUsize::new(0)),
            failure: Arc::new(Mutex::new(None)),
        };
        let writer = tokio::spawn(write_queue(
            id,
            Arc::clone(&sender),
            rx,
            Arc::clone(&queue.backlog),
            Arc::clone(&queue.failure),
        ));
        members.members.push(Member { queue, sender, writer });
        id
    }

    /// Deregister a sender and stop its writer. Frames still queued for it
    /// are discarded.
    pub fn remove(&self, id: SenderId) -> Option<Arc<dyn Sender>> {
        let member = {
            let mut members = self.members.lock();
            let pos = members.members.iter().position(|m| m.queue.id == id)?;
            members.members.remove(pos)
        };
        member.writer.abort();
        Some(member.sender)
    }

    pub fn len(&self) -> usize {
        self.members.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until every frame queued so far has been written or failed.
    ///
    /// Reports the senders that failed since the last report.
    pub async fn flush(&self) -> Result<(), CommunicationError> {
        let queues = self.snapshot()?;
        let written = queues.iter().map(|queue| {
            let (done, wait) = oneshot::channel();
            let _ = queue.items.send(Item::Flush(done));
            // A closed channel means the writer already stopped.
            async move {
                let _ = wait.await;
            }
        });
        join_all(written).await;

        let failed = queues
            .iter()
            .filter_map(|queue| {
                let failure = queue.failure.lock().take();
                failure.map(|e| (queue.id, e))
            })
            .collect();
        outcome(queues.len(), failed)
    }

    fn snapshot(&self) -> Result<Vec<Queue>, CommunicationError> {
        let members = self.members.lock();
        if members.closed {
            return Err(CommunicationError::Shutdown);
        }
        Ok(members.members.iter().map(|m| m.queue.clone()).collect())
    }
}

fn outcome(
    total: usize,
    failed: Vec<(SenderId, CommunicationError)>,
) -> Result<(), CommunicationError> {
    if failed.is_empty() {
        return Ok(());
    }
    let delivered = total - failed.len();
    Err(BroadcastError { failed, delivered }.into())
}

async fn write_queue(
    id: SenderId,
    sender: Arc<dyn Sender>,
    mut items: mpsc::UnboundedReceiver<Item>,
    backlog: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<CommunicationError>>>,
) {
    while let Some(item) = items.recv().await {
        match item {
            Item::Frame(frame) => {
                let result = sender.send_frame(&frame).await;
                backlog.fetch_sub(1, Ordering::SeqCst);
                if let Err(e) = result {
                    debug!("{} write failed: {}", id, e);
                    *failure.lock() = Some(e);
                    return;
                }
            }
            Item::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[async_trait]
impl Sender for FanOutSender {
    /// Queue `frame` for every sender. Returns once queued; an `Ok` does not
    /// mean any peer has read it.
    async fn send_frame(&self, frame: &Frame) -> Result<(), CommunicationError> {
        let queues = self.snapshot()?;
        let mut failed = Vec::new();
        for queue in &queues {
            let failure = queue.failure.lock().take();
            if let Some(e) = failure {
                failed.push((queue.id, e));
                continue;
            }
            let queued = queue.backlog.fetch_add(1, Ordering::SeqCst);
            if queued >= self.max_backlog {
                queue.backlog.fetch_sub(1, Ordering::SeqCst);
                failed.push((queue.id, CommunicationError::Lagging { queued }));
                continue;
            }
            if queue.items.send(Item::Frame(frame.clone())).is_err() {
                failed.push((queue.id, CommunicationError::Shutdown));
            }
        }
        outcome(queues.len(), failed)
    }

    /// Drain each queue within the drain timeout, then shut every sender
    /// down. A writer still busy at the deadline is abandoned with its
    /// remaining frames.
    async fn shutdown(&self) {
        let members = {
            let mut members = self.members.lock();
            members.closed = true;
            std::mem::take(&mut members.members)
        };
        let drain_timeout = self.drain_timeout;
        join_all(members.into_iter().map(|member| async move {
            let Member { queue, sender, mut writer } = member;
            let id = queue.id;
            // The writer exits once its queue is empty and closed.
            drop(queue);
            if tokio::time::timeout(drain_timeout, &mut writer).await.is_err() {
                warn!("{} still writing after {:?}, dropping its queue", id, drain_timeout);
                writer.abort();
                let _ = writer.await;
            }
            sender.shutdown().await;
        }))
        .await;
    }
}

#[cfg(test)]
#[path = "fan_out_tests.rs"]
mod tests;
