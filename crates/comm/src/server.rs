// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server endpoints over accepted connections.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use drover_core::Message;
use drover_wire::Frame;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::acceptor::{Accepted, AcceptedQueue, ConnectionId};
use crate::error::CommunicationError;
use crate::fan_out::{FanOutSender, SenderId};
use crate::receiver::{Receiver, StreamReceiver};
use crate::sender::{Sender, StreamSender};

/// What happened on one of a [`ServerReceiver`]'s connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Message { connection: ConnectionId, message: Message },
    Closed { connection: ConnectionId },
}

/// Reads every connection from an accepted queue concurrently.
///
/// Events of one connection arrive in the order they were sent, and that
/// connection's `Closed` comes after all of its messages.
pub struct ServerReceiver {
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<ConnectionEvent>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ServerReceiver {
    pub fn start(queue: AcceptedQueue) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(serve_readers(queue, tx, cancel.clone()));
        Self {
            events: tokio::sync::Mutex::new(rx),
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Next event from any connection; `None` after shutdown.
    pub async fn next_event(&self) -> Option<ConnectionEvent> {
        let mut events = tokio::select! {
            _ = self.cancel.cancelled() => return None,
            events = self.events.lock() => events,
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = events.recv() => event,
        }
    }

    /// Stop reading and wait for the reader tasks to wind down.
    pub async fn close(&self) {
        self.cancel.cancel();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("server receiver task failed: {}", e);
            }
        }
    }
}

#[async_trait]
impl Receiver for ServerReceiver {
    async fn receive(&self) -> Result<Option<Message>, CommunicationError> {
        while let Some(event) = self.next_event().await {
            if let ConnectionEvent::Message { message, .. } = event {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }

    fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ServerReceiver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn serve_readers(
    mut queue: AcceptedQueue,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    cancel: CancellationToken,
) {
    let mut readers = Vec::new();
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = queue.recv() => match accepted {
                Some(accepted) => accepted,
                None => break,
            },
        };
        let connection = accepted.id;
        debug!("reading {} from {}", connection, accepted.peer);
        let receiver = StreamReceiver::new(accepted.stream);
        let events = events.clone();
        let cancel = cancel.clone();
        readers.retain(|h: &JoinHandle<()>| !h.is_finished());
        readers.push(tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = receiver.receive() => next,
                };
                match next {
                    Ok(Some(message)) => {
                        if events.send(ConnectionEvent::Message { connection, message }).is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("{}: read failed: {}", connection, e);
                        break;
                    }
                }
            }
            debug!("{} closed", connection);
            let _ = events.send(ConnectionEvent::Closed { connection });
        }));
    }
    for reader in readers {
        let _ = reader.await;
    }
}

/// How long a dropped connection gets to take its close marker.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Broadcasts to every connection from an accepted queue.
///
/// Broadcasts are queued per connection (see [`FanOutSender`]). A connection
/// whose write failed is deregistered and shut down when the next broadcast
/// or [`flush`](ServerSender::flush) reports it; the failure is still
/// reported to the caller. Each connection is greeted on its own task.
pub struct ServerSender {
    fan_out: Arc<FanOutSender>,
    connections: Arc<Mutex<Vec<(SenderId, ConnectionId)>>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ServerSender {
    pub fn start(queue: AcceptedQueue) -> Self {
        Self::spawn(queue, None)
    }

    /// Like [`start`](ServerSender::start), but each connection is sent
    /// `greeting` before it joins the broadcast. A connection that cannot
    /// take the greeting is dropped.
    pub fn with_greeting(queue: AcceptedQueue, greeting: Message) -> Self {
        Self::spawn(queue, Some(greeting))
    }

    fn spawn(mut queue: AcceptedQueue, greeting: Option<Message>) -> Self {
        let fan_out = Arc::new(FanOutSender::new());
        let connections = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancellationToken::new();

        let task = {
            let fan_out = Arc::clone(&fan_out);
            let connections = Arc::clone(&connections);
            let cancel = cancel.clone();
            let greeting = match greeting.as_ref().map(Frame::encode).transpose() {
                Ok(greeting) => greeting,
                Err(e) => {
                    warn!("failed to encode greeting: {}", e);
                    None
                }
            };
            tokio::spawn(async move {
                let mut joining = Vec::new();
                loop {
                    let accepted = tokio::select! {
                        _ = cancel.cancelled() => break,
                        accepted = queue.recv() => match accepted {
                            Some(accepted) => accepted,
                            None => break,
                        },
                    };
                    // Greet off the accept loop so a slow peer cannot hold up the next.
                    joining.retain(|h: &JoinHandle<()>| !h.is_finished());
                    joining.push(tokio::spawn(join(
                        accepted,
                        greeting.clone(),
                        Arc::clone(&fan_out),
                        Arc::clone(&connections),
                        cancel.clone(),
                    )));
                }
                for handle in joining {
                    let _ = handle.await;
                }
            })
        };

        Self { fan_out, connections, cancel, task: Mutex::new(Some(task)) }
    }

    /// Number of connections currently receiving broadcasts.
    pub fn len(&self) -> usize {
        self.fan_out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fan_out.is_empty()
    }

    /// Wait for every broadcast so far to be written, dropping connections
    /// that failed.
    pub async fn flush(&self) -> Result<(), CommunicationError> {
        self.dropping_failed(self.fan_out.flush().await).await
    }

    async fn dropping_failed(
        &self,
        result: Result<(), CommunicationError>,
    ) -> Result<(), CommunicationError> {
        match result {
            Err(CommunicationError::Broadcast(e)) => {
                self.drop_failed(e.failed_ids().collect()).await;
                Err(CommunicationError::Broadcast(e))
            }
            other => other,
        }
    }

    async fn drop_failed(&self, failed: Vec<SenderId>) {
        for sender_id in failed {
            let connection = {
                let mut connections = self.connections.lock();
                let pos = connections.iter().position(|(sid, _)| *sid == sender_id);
                pos.map(|pos| connections.remove(pos).1)
            };
            if let Some(sender) = self.fan_out.remove(sender_id) {
                if let Some(connection) = connection {
                    info!("{} left broadcast", connection);
                }
                // A peer that stopped reading could block the close marker.
                tokio::spawn(async move {
                    if tokio::time::timeout(CLOSE_TIMEOUT, sender.shutdown()).await.is_err() {
                        debug!("close of failed connection timed out");
                    }
                });
            }
        }
    }
}

/// Greet one connection, then add it to the broadcast.
async fn join(
    accepted: Accepted,
    greeting: Option<Frame>,
    fan_out: Arc<FanOutSender>,
    connections: Arc<Mutex<Vec<(SenderId, ConnectionId)>>>,
    cancel: CancellationToken,
) {
    let sender = StreamSender::new(accepted.stream);
    if let Some(greeting) = &greeting {
        let greeted = tokio::select! {
            _ = cancel.cancelled() => return,
            greeted = sender.send_frame(greeting) => greeted,
        };
        if let Err(e) = greeted {
            warn!("{} from {}: greeting failed: {}", accepted.id, accepted.peer, e);
            return;
        }
    }
    let sender_id = fan_out.add(Arc::new(sender));
    connections.lock().push((sender_id, accepted.id));
    info!("{} from {} joined broadcast", accepted.id, accepted.peer);
}

#[async_trait]
impl Sender for ServerSender {
    async fn send_frame(&self, frame: &Frame) -> Result<(), CommunicationError> {
        self.dropping_failed(self.fan_out.send_frame(frame).await).await
    }

    async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("server sender task failed: {}", e);
            }
        }
        self.fan_out.shutdown().await;
        self.connections.lock().clear();
    }
}

impl Drop for ServerSender {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
