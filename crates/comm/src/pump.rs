// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background relay from one receiver into senders.

use std::sync::Arc;

use drover_wire::Frame;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CommunicationError;
use crate::receiver::Receiver;
use crate::sender::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Created,
    Running,
    Shutdown,
}

drover_core::simple_display! {
    PumpState {
        Created => "created",
        Running => "running",
        Shutdown => "shutdown",
    }
}

/// Relays every message from a receiver to a fixed list of senders.
///
/// Each message is encoded once. A sender that fails is logged and skipped
/// for that message; the relay carries on. The relay ends when the receiver
/// closes or fails, or on [`shutdown`](MessagePump::shutdown), and always
/// shuts the receiver down on its way out. Shutdown lets the message in
/// flight reach every sender first. Senders stay open; they belong to
/// whoever built the pump.
pub struct MessagePump {
    receiver: Arc<dyn Receiver>,
    senders: Vec<Arc<dyn Sender>>,
    state: Mutex<PumpState>,
    cancel: CancellationToken,
    finished: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MessagePump {
    pub fn new(receiver: Arc<dyn Receiver>, senders: Vec<Arc<dyn Sender>>) -> Self {
        Self {
            receiver,
            senders,
            state: Mutex::new(PumpState::Created),
            cancel: CancellationToken::new(),
            finished: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Spawn the relay task. Starting a running pump is a no-op.
    pub fn start(&self) -> Result<(), CommunicationError> {
        {
            let mut state = self.state.lock();
            match *state {
                PumpState::Created => *state = PumpState::Running,
                PumpState::Running => return Ok(()),
                PumpState::Shutdown => return Err(CommunicationError::Shutdown),
            }
        }
        let handle = tokio::spawn(relay(
            Arc::clone(&self.receiver),
            self.senders.clone(),
            self.cancel.clone(),
            self.finished.clone(),
        ));
        *self.task.lock() = Some(handle);
        Ok(())
    }

    pub fn state(&self) -> PumpState {
        *self.state.lock()
    }

    /// Wait until the relay ends on its own or is shut down.
    pub async fn finished(&self) {
        self.finished.cancelled().await;
    }

    /// Stop the relay and wait for it to exit. Idempotent.
    pub async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), PumpState::Shutdown);
        if previous == PumpState::Created {
            self.receiver.shutdown();
            self.finished.cancel();
        }
        self.cancel.cancel();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("message pump task failed: {}", e);
                self.finished.cancel();
            }
        }
        // A concurrent caller that lost the handle still waits for the exit.
        self.finished.cancelled().await;
    }
}

async fn relay(
    receiver: Arc<dyn Receiver>,
    senders: Vec<Arc<dyn Sender>>,
    cancel: CancellationToken,
    finished: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = receiver.receive() => next,
        };
        let message = match next {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!("pump source closed");
                break;
            }
            Err(e) => {
                warn!("pump source failed: {}", e);
                break;
            }
        };
        let frame = match Frame::encode(&message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("failed to encode {}: {}", message.kind(), e);
                continue;
            }
        };
        // Never cancelled mid-frame: a half-written frame would tear the stream.
        for (index, sender) in senders.iter().enumerate() {
            if let Err(e) = sender.send_frame(&frame).await {
                warn!("pump sender {} failed on {}: {}", index, message.kind(), e);
            }
        }
    }
    receiver.shutdown();
    finished.cancel();
}

#[cfg(test)]
#[path = "pump_tests.rs"]
mod tests;
