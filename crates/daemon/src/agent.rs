// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent: relays console control to the workers on this host.

use std::net::SocketAddr;
use std::sync::Arc;

use drover_comm::{
    Acceptor, ClientReceiver, CommunicationError, Connector, MessagePump, Receiver, Sender,
    ServerSender,
};
use drover_core::Message;
use drover_wire::ConnectionType;
use tracing::{info, warn};

use crate::lifecycle::{Config, LifecycleError};

pub struct Agent {
    acceptor: Acceptor,
    workers: Arc<ServerSender>,
    relay: Option<MessagePump>,
    wait_for_start: bool,
}

impl Agent {
    /// Bind the agent port and, if configured, connect to the console.
    ///
    /// An unreachable console is not fatal; workers are then told not to
    /// report, and their barriers stay local.
    pub async fn start(config: &Config, wait_for_start: bool) -> Result<Self, LifecycleError> {
        let acceptor =
            Acceptor::bind(&config.agent_address(), config.handshake_timeout, &[ConnectionType::Worker])
                .await?;
        let queue = acceptor
            .take_queue(ConnectionType::Worker)
            .ok_or(LifecycleError::Communication(CommunicationError::Shutdown))?;

        let console = if config.use_console {
            let connector = Connector::new(&config.console_host, config.console_port, ConnectionType::Control)
                .connect_timeout(config.connect_timeout);
            match ClientReceiver::connect(&connector).await {
                Ok(receiver) => Some(Arc::new(receiver)),
                Err(e) => {
                    warn!("console unreachable at {}, proceeding without the console: {}", connector.address(), e);
                    None
                }
            }
        } else {
            None
        };

        // Nobody could send process:start
        let wait_for_start = wait_for_start && console.is_some();
        let greeting = Message::Initialise { wait_for_start, report_to_console: console.is_some() };
        let workers = Arc::new(ServerSender::with_greeting(queue, greeting));

        let relay = match console {
            Some(console) => {
                let pump = MessagePump::new(console as Arc<dyn Receiver>, vec![workers.clone() as Arc<dyn Sender>]);
                pump.start()?;
                Some(pump)
            }
            None => None,
        };

        info!(
            "agent listening on {} (console: {})",
            acceptor.local_addr(),
            if relay.is_some() { "connected" } else { "none" }
        );
        Ok(Self { acceptor, workers, relay, wait_for_start })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.acceptor.local_addr()
    }

    /// Whether workers are told to wait for `process:start`.
    pub fn waits_for_start(&self) -> bool {
        self.wait_for_start
    }

    pub fn is_relaying(&self) -> bool {
        self.relay.is_some()
    }

    /// Number of workers connected.
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Send a message to every worker on this host.
    pub async fn broadcast(&self, message: &Message) -> Result<(), CommunicationError> {
        self.workers.send(message).await
    }

    /// Resolves once the console connection is gone. Never resolves when
    /// running without a console.
    pub async fn console_closed(&self) {
        match &self.relay {
            Some(relay) => relay.finished().await,
            None => std::future::pending().await,
        }
    }

    /// Stop relaying and close every worker connection.
    pub async fn shutdown(&self) {
        if let Some(relay) = &self.relay {
            relay.shutdown().await;
        }
        self.workers.shutdown().await;
        self.acceptor.shutdown().await;
        info!("agent stopped");
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
