// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process context.
//!
//! Owns a worker's connections: control messages come in from its agent,
//! reports and barrier updates go out to the console. Incoming messages are
//! dispatched to the barrier registry and to the process-control watch.

use std::sync::Arc;

use drover_comm::{
    ClientReceiver, ClientSender, CommunicationError, Connector, MessageDispatcher, Receiver, Sender,
};
use drover_core::{Message, ProcessState, ThreadCounter, WorkerIdentity};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::BarrierError;
use crate::registry::BarrierGroupRegistry;

/// Last process-control command seen from the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    None,
    Start,
    Reset,
    Stop,
}

pub struct WorkerContext {
    identity: WorkerIdentity,
    registry: Arc<BarrierGroupRegistry>,
    dispatcher: Arc<MessageDispatcher>,
    report: Option<Arc<dyn Sender>>,
    inbound: Option<Arc<dyn Receiver>>,
    threads: ThreadCounter,
    wait_for_start: bool,
    control: watch::Receiver<Control>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerContext {
    /// Connect to the agent, read its `Initialise`, and open the report
    /// connection to the console if asked to.
    ///
    /// Failing to reach the console is not fatal: barriers then only span
    /// this process.
    pub async fn connect(
        identity: WorkerIdentity,
        agent: &Connector,
        console: &Connector,
        threads: ThreadCounter,
    ) -> Result<Self, CommunicationError> {
        let inbound = ClientReceiver::connect(agent).await?;
        let (wait_for_start, report_to_console) = match inbound.receive().await? {
            Some(Message::Initialise { wait_for_start, report_to_console }) => {
                (wait_for_start, report_to_console)
            }
            Some(other) => {
                warn!("expected process:initialise from agent, got {}", other.kind());
                (false, true)
            }
            None => return Err(CommunicationError::Shutdown),
        };

        let report: Option<Arc<dyn Sender>> = if report_to_console {
            match ClientSender::connect(console).await {
                Ok(sender) => Some(Arc::new(sender)),
                Err(e) => {
                    warn!("console unreachable at {}, proceeding without the console: {}", console.address(), e);
                    None
                }
            }
        } else {
            None
        };

        let context = Self::from_parts(identity, Some(Arc::new(inbound)), report, threads);
        Ok(Self { wait_for_start, ..context })
    }

    /// Build a context over existing endpoints.
    pub fn from_parts(
        identity: WorkerIdentity,
        inbound: Option<Arc<dyn Receiver>>,
        report: Option<Arc<dyn Sender>>,
        threads: ThreadCounter,
    ) -> Self {
        let registry = Arc::new(BarrierGroupRegistry::new(identity.clone(), report.clone()));
        let dispatcher = Arc::new(MessageDispatcher::new());
        dispatcher.subscribe(registry.clone());

        let (control_tx, control) = watch::channel(Control::None);
        dispatcher.subscribe(Arc::new(move |message: &Message| {
            let control = match message {
                Message::Start => Control::Start,
                Message::Reset => Control::Reset,
                Message::Stop => Control::Stop,
                _ => return,
            };
            control_tx.send_replace(control);
        }));

        let dispatch_task = inbound.as_ref().map(|inbound| {
            let dispatcher = Arc::clone(&dispatcher);
            let inbound = Arc::clone(inbound);
            tokio::spawn(async move {
                if let Err(e) = dispatcher.run(inbound.as_ref()).await {
                    warn!("agent connection failed: {}", e);
                }
                debug!("agent connection closed");
            })
        });

        info!("worker {} ready (console: {})", identity, if report.is_some() { "connected" } else { "none" });
        Self {
            identity,
            registry,
            dispatcher,
            report,
            inbound,
            threads,
            wait_for_start: false,
            control,
            dispatch_task: Mutex::new(dispatch_task),
        }
    }

    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    pub fn registry(&self) -> &Arc<BarrierGroupRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<MessageDispatcher> {
        &self.dispatcher
    }

    pub fn threads(&self) -> &ThreadCounter {
        &self.threads
    }

    /// True when the agent asked this worker to hold until `Start`.
    pub fn waits_for_start(&self) -> bool {
        self.wait_for_start
    }

    /// Wait for `Start` if the agent asked for it. Returns `false` if the
    /// agent sent `Stop` or went away first.
    pub async fn wait_for_start(&self) -> bool {
        if !self.wait_for_start {
            return true;
        }
        let mut control = self.control.clone();
        let started = match control.wait_for(|c| matches!(c, Control::Start | Control::Stop)).await {
            Ok(c) => *c == Control::Start,
            Err(_) => false,
        };
        started
    }

    pub fn stop_requested(&self) -> bool {
        *self.control.borrow() == Control::Stop
    }

    pub fn reset_requested(&self) -> bool {
        *self.control.borrow() == Control::Reset
    }

    /// Report process state and thread counts to the console.
    pub async fn report_status(&self, state: ProcessState) -> Result<(), BarrierError> {
        let Some(report) = &self.report else {
            debug!("no console, status {} not reported", state);
            return Ok(());
        };
        let message = Message::ReportStatus {
            worker: self.identity.clone(),
            state,
            running_threads: self.threads.live(),
            total_threads: self.threads.total(),
        };
        report.send(&message).await?;
        Ok(())
    }

    /// Cancel outstanding waits and close every connection.
    pub async fn shutdown(&self) {
        self.registry.shutdown();
        if let Some(inbound) = &self.inbound {
            inbound.shutdown();
        }
        let task = self.dispatch_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("dispatch task failed: {}", e);
            }
        }
        if let Some(report) = &self.report {
            report.shutdown().await;
        }
        info!("worker {} shut down", self.identity);
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
