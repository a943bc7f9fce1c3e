// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound TCP connections.
//!
//! The acceptor runs in a spawned task. Each accepted socket gets its own
//! handshake task that reads the connection-type tag, so a slow or broken
//! peer never holds up the accept loop. Handshaken connections are pushed
//! onto the queue for their type.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use drover_wire::{ConnectionType, ProtocolError};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::CommunicationError;

/// Process-local identifier of an accepted connection. Increases monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A connection whose tag has been read.
#[derive(Debug)]
pub struct Accepted {
    pub id: ConnectionId,
    pub connection_type: ConnectionType,
    pub peer: SocketAddr,
    pub stream: TcpStream,
}

/// Accepted connections of one type, in handshake-completion order.
pub type AcceptedQueue = mpsc::UnboundedReceiver<Accepted>;

pub struct Acceptor {
    local_addr: SocketAddr,
    queues: Mutex<HashMap<ConnectionType, AcceptedQueue>>,
    accept_errors: Arc<AtomicU64>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Acceptor {
    /// Listen on `address` and start accepting connections of the `accepts`
    /// types.
    ///
    /// A peer that has not sent its tag within `handshake_timeout`, or whose
    /// tag names a type not in `accepts`, is dropped.
    pub async fn bind(
        address: &str,
        handshake_timeout: Duration,
        accepts: &[ConnectionType],
    ) -> Result<Self, CommunicationError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| CommunicationError::Bind { address: address.to_string(), source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| CommunicationError::Bind { address: address.to_string(), source })?;

        let mut routes = HashMap::new();
        let mut queues = HashMap::new();
        for &ty in accepts {
            let (tx, rx) = mpsc::unbounded_channel();
            routes.insert(ty, tx);
            queues.insert(ty, rx);
        }

        let cancel = CancellationToken::new();
        let accept_errors = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::new(routes),
            handshake_timeout,
            cancel.clone(),
            Arc::clone(&accept_errors),
        ));
        info!("accepting connections on {}", local_addr);

        Ok(Self {
            local_addr,
            queues: Mutex::new(queues),
            accept_errors,
            cancel,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Take the queue for an accepted connection type. Each queue can be
    /// taken once; connections arriving before then wait in it.
    pub fn take_queue(&self, connection_type: ConnectionType) -> Option<AcceptedQueue> {
        self.queues.lock().remove(&connection_type)
    }

    /// Number of failed `accept` calls so far.
    pub fn accept_errors(&self) -> u64 {
        self.accept_errors.load(Ordering::Relaxed)
    }

    /// Stop accepting and wait for the accept loop to exit. Idempotent.
    ///
    /// Connections already handed out are unaffected.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("accept loop failed: {}", e);
            }
            info!("stopped accepting on {}", self.local_addr);
        }
    }
}

impl Drop for Acceptor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

type Routes = Arc<HashMap<ConnectionType, mpsc::UnboundedSender<Accepted>>>;

async fn accept_loop(
    listener: TcpListener,
    routes: Routes,
    handshake_timeout: Duration,
    cancel: CancellationToken,
    accept_errors: Arc<AtomicU64>,
) {
    let mut next_id = 0u64;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = listener.accept() => match result {
                Ok((stream, peer)) => {
                    next_id += 1;
                    let id = ConnectionId(next_id);
                    debug!("{} accepted from {}", id, peer);
                    let routes = Arc::clone(&routes);
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            _ = handshake(id, peer, stream, handshake_timeout, &routes) => {}
                        }
                    });
                }
                Err(e) => {
                    accept_errors.fetch_add(1, Ordering::Relaxed);
                    error!("accept error: {}", e);
                }
            }
        }
    }
}

async fn handshake(
    id: ConnectionId,
    peer: SocketAddr,
    mut stream: TcpStream,
    timeout: Duration,
    routes: &Routes,
) {
    let read = tokio::time::timeout(timeout, ConnectionType::read_from(&mut stream))
        .await
        .unwrap_or(Err(ProtocolError::Timeout));
    let connection_type = match read {
        Ok(ty) => ty,
        Err(e) => {
            log_handshake_error(id, peer, e);
            return;
        }
    };
    let Some(route) = routes.get(&connection_type) else {
        warn!("{} from {}: unexpected {} connection, closing", id, peer, connection_type);
        return;
    };
    if let Err(e) = stream.set_nodelay(true) {
        debug!("{}: failed to set TCP_NODELAY: {}", id, e);
    }
    debug!("{} from {} is a {} connection", id, peer, connection_type);

    if route.send(Accepted { id, connection_type, peer, stream }).is_err() {
        debug!("{}: {} queue dropped, closing", id, connection_type);
    }
}

fn log_handshake_error(id: ConnectionId, peer: SocketAddr, e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("{} from {} closed before handshake", id, peer),
        ProtocolError::Timeout => warn!("{} from {}: handshake timeout", id, peer),
        _ => warn!("{} from {}: handshake failed: {}", id, peer, e),
    }
}

#[cfg(test)]
#[path = "acceptor_tests.rs"]
mod tests;
