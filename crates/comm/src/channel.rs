// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process sender/receiver pair.
//!
//! Carries encoded frames rather than message values, so a message crosses
//! a channel exactly as it would cross a socket.

use async_trait::async_trait;
use drover_core::Message;
use drover_wire::{Frame, ProtocolError};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::CommunicationError;
use crate::receiver::{ReceiveState, Receiver};
use crate::sender::Sender;

/// Create a connected in-process pair.
pub fn channel() -> (ChannelSender, ChannelReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelSender { tx: Mutex::new(Some(tx)) },
        ChannelReceiver { rx: tokio::sync::Mutex::new(rx), state: ReceiveState::new() },
    )
}

pub struct ChannelSender {
    tx: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
}

#[async_trait]
impl Sender for ChannelSender {
    async fn send_frame(&self, frame: &Frame) -> Result<(), CommunicationError> {
        let tx = self.tx.lock().clone().ok_or(CommunicationError::Shutdown)?;
        tx.send(frame.clone())
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::BrokenPipe).into())
    }

    async fn shutdown(&self) {
        let Some(tx) = self.tx.lock().take() else {
            return;
        };
        if let Ok(frame) = Frame::encode(&Message::CloseCommunication) {
            let _ = tx.send(frame);
        }
    }
}

pub struct ChannelReceiver {
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Frame>>,
    state: ReceiveState,
}

#[async_trait]
impl Receiver for ChannelReceiver {
    async fn receive(&self) -> Result<Option<Message>, CommunicationError> {
        if self.state.is_done() {
            return Ok(None);
        }
        let cancel = self.state.cancel();
        let mut rx = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            rx = self.rx.lock() => rx,
        };
        if self.state.is_done() {
            return Ok(None);
        }
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            next = rx.recv() => next,
        };
        self.state.settle(next.ok_or(ProtocolError::ConnectionClosed))
    }

    fn shutdown(&self) {
        self.state.shutdown();
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
