// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound message endpoints

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use drover_core::Message;
use drover_wire::{read_frame, Frame, ProtocolError};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::error::CommunicationError;

/// Something messages can be read from.
#[async_trait]
pub trait Receiver: Send + Sync {
    /// Wait for the next message.
    ///
    /// `Ok(None)` once the peer closed the stream (EOF or the close marker)
    /// or after [`shutdown`](Receiver::shutdown). An `Err` also leaves the
    /// receiver closed.
    async fn receive(&self) -> Result<Option<Message>, CommunicationError>;

    /// Wake blocked and future `receive` calls with `Ok(None)`. Idempotent.
    fn shutdown(&self);
}

/// Close and cancellation bookkeeping shared by the receiver implementations.
pub(crate) struct ReceiveState {
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl ReceiveState {
    pub(crate) fn new() -> Self {
        Self { cancel: CancellationToken::new(), closed: AtomicBool::new(false) }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Turn a frame read into a receive result, closing on anything terminal.
    pub(crate) fn settle(
        &self,
        read: Result<Frame, ProtocolError>,
    ) -> Result<Option<Message>, CommunicationError> {
        let outcome = match read {
            Ok(frame) => frame.decode().map(Some),
            Err(ProtocolError::ConnectionClosed) => Ok(None),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(Some(Message::CloseCommunication)) | Ok(None) => {
                self.closed.store(true, Ordering::Release);
                Ok(None)
            }
            Ok(Some(message)) => Ok(Some(message)),
            Err(e) => {
                self.closed.store(true, Ordering::Release);
                Err(e.into())
            }
        }
    }
}

/// A [`Receiver`] over any async byte stream.
pub struct StreamReceiver<R> {
    reader: tokio::sync::Mutex<R>,
    state: ReceiveState,
}

impl<R> StreamReceiver<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self { reader: tokio::sync::Mutex::new(reader), state: ReceiveState::new() }
    }
}

#[async_trait]
impl<R> Receiver for StreamReceiver<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn receive(&self) -> Result<Option<Message>, CommunicationError> {
        if self.state.is_done() {
            return Ok(None);
        }
        let cancel = self.state.cancel();
        let mut reader = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            reader = self.reader.lock() => reader,
        };
        // Another caller may have hit EOF while we queued for the lock.
        if self.state.is_done() {
            return Ok(None);
        }
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            read = read_frame(&mut *reader) => read,
        };
        self.state.settle(read)
    }

    fn shutdown(&self) {
        self.state.shutdown();
    }
}

#[cfg(test)]
#[path = "receiver_tests.rs"]
mod tests;
