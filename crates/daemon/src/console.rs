// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Console: barrier coordination and control broadcast.
//!
//! One listener serves three kinds of peer. Agents open `Control`
//! connections and receive every broadcast. Workers open `Report`
//! connections carrying status and barrier traffic into the coordinator.
//! Console clients open `ConsoleClient` connections whose messages are
//! relayed onto the broadcast.

use std::net::SocketAddr;
use std::sync::Arc;

use drover_comm::{
    Acceptor, AcceptedQueue, ClientSender, CommunicationError, ConnectionEvent, Connector,
    MessagePump, Sender, ServerReceiver, ServerSender,
};
use drover_core::Message;
use drover_sync::BarrierCoordinator;
use drover_wire::ConnectionType;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::lifecycle::{Config, LifecycleError};

pub struct Console {
    acceptor: Acceptor,
    broadcast: Arc<ServerSender>,
    reports: Arc<ServerReceiver>,
    clients: Arc<ServerReceiver>,
    relay: MessagePump,
    coordinator: Arc<BarrierCoordinator>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Console {
    /// Bind the console port and start serving.
    pub async fn start(config: &Config) -> Result<Self, LifecycleError> {
        let acceptor = Acceptor::bind(
            &config.console_bind_address(),
            config.handshake_timeout,
            &[ConnectionType::Control, ConnectionType::Report, ConnectionType::ConsoleClient],
        )
        .await?;

        let broadcast = Arc::new(ServerSender::start(take_queue(&acceptor, ConnectionType::Control)?));
        let reports = Arc::new(ServerReceiver::start(take_queue(&acceptor, ConnectionType::Report)?));
        let clients = Arc::new(ServerReceiver::start(take_queue(&acceptor, ConnectionType::ConsoleClient)?));

        let coordinator = Arc::new(BarrierCoordinator::new(broadcast.clone()));
        let task = tokio::spawn(serve_reports(Arc::clone(&reports), Arc::clone(&coordinator)));

        let relay = MessagePump::new(clients.clone(), vec![broadcast.clone() as Arc<dyn Sender>]);
        relay.start()?;

        info!("console listening on {}", acceptor.local_addr());
        Ok(Self {
            acceptor,
            broadcast,
            reports,
            clients,
            relay,
            coordinator,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.acceptor.local_addr()
    }

    pub fn coordinator(&self) -> &Arc<BarrierCoordinator> {
        &self.coordinator
    }

    /// Number of agents receiving broadcasts.
    pub fn agents(&self) -> usize {
        self.broadcast.len()
    }

    /// Send a control message to every connected agent.
    pub async fn broadcast(&self, message: &Message) -> Result<(), CommunicationError> {
        info!("broadcasting {} to {} agent(s)", message.kind(), self.broadcast.len());
        self.broadcast.send(message).await
    }

    /// Stop serving. Agents are sent `comm:close` before their connections shut.
    pub async fn shutdown(&self) {
        self.relay.shutdown().await;
        self.clients.close().await;
        self.reports.close().await;
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("console report task failed: {}", e);
            }
        }
        self.broadcast.shutdown().await;
        self.acceptor.shutdown().await;
        info!("console stopped");
    }
}

fn take_queue(acceptor: &Acceptor, connection_type: ConnectionType) -> Result<AcceptedQueue, LifecycleError> {
    acceptor.take_queue(connection_type).ok_or(LifecycleError::Communication(CommunicationError::Shutdown))
}

async fn serve_reports(reports: Arc<ServerReceiver>, coordinator: Arc<BarrierCoordinator>) {
    while let Some(event) = reports.next_event().await {
        match event {
            ConnectionEvent::Message { connection, message } => {
                if let Message::ReportStatus { worker, state, running_threads, total_threads } = &message {
                    info!("{} {}: {} ({}/{} threads)", connection, worker, state, running_threads, total_threads);
                } else {
                    debug!("{}: {}", connection, message.log_summary());
                }
                coordinator.handle(Some(connection), &message).await;
            }
            ConnectionEvent::Closed { connection } => coordinator.connection_closed(connection).await,
        }
    }
}

/// Deliver one control message to the console at `connector`'s address for
/// broadcast to its agents.
pub async fn send_control(connector: &Connector, message: &Message) -> Result<(), CommunicationError> {
    let sender = ClientSender::connect(connector).await?;
    let sent = sender.send(message).await;
    sender.shutdown().await;
    sent
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;
