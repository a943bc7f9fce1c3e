// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound message endpoints

use std::io;

use async_trait::async_trait;
use drover_core::Message;
use drover_wire::{write_frame, Frame};
use parking_lot::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::CommunicationError;

/// Something messages can be written to.
///
/// Frames written through one sender arrive in the order they were written.
/// After [`shutdown`](Sender::shutdown) every send fails with
/// [`CommunicationError::Shutdown`].
#[async_trait]
pub trait Sender: Send + Sync {
    /// Write an already-encoded frame.
    async fn send_frame(&self, frame: &Frame) -> Result<(), CommunicationError>;

    /// Encode and write a message.
    async fn send(&self, message: &Message) -> Result<(), CommunicationError> {
        let frame = Frame::encode(message)?;
        self.send_frame(&frame).await
    }

    /// Write the close marker, flush, and release the transport. Idempotent.
    async fn shutdown(&self);
}

/// A [`Sender`] over any async byte stream.
///
/// A write that is interrupted partway (its future dropped, or an I/O
/// error) tears the stream: the peer can no longer find frame boundaries,
/// so later sends fail and shutdown skips the close marker.
pub struct StreamSender<W> {
    // Held for a whole frame so concurrent sends never interleave bytes.
    writer: tokio::sync::Mutex<Option<Writer<W>>>,
}

struct Writer<W> {
    stream: W,
    torn: bool,
}

impl<W> StreamSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self { writer: tokio::sync::Mutex::new(Some(Writer { stream: writer, torn: false })) }
    }
}

#[async_trait]
impl<W> Sender for StreamSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_frame(&self, frame: &Frame) -> Result<(), CommunicationError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(CommunicationError::Shutdown)?;
        if writer.torn {
            let torn = io::Error::new(io::ErrorKind::BrokenPipe, "stream torn by an interrupted write");
            return Err(torn.into());
        }
        // Cleared only once the whole frame is out.
        writer.torn = true;
        write_frame(&mut writer.stream, frame).await?;
        writer.torn = false;
        Ok(())
    }

    async fn shutdown(&self) {
        let Some(mut writer) = self.writer.lock().await.take() else {
            return;
        };
        if writer.torn {
            debug!("stream torn, closing without marker");
        } else {
            match Frame::encode(&Message::CloseCommunication) {
                Ok(frame) => {
                    if let Err(e) = write_frame(&mut writer.stream, &frame).await {
                        debug!("close marker not delivered: {}", e);
                    }
                }
                Err(e) => debug!("failed to encode close marker: {}", e),
            }
        }
        if let Err(e) = writer.stream.shutdown().await {
            debug!("stream shutdown failed: {}", e);
        }
    }
}

/// Buffers encoded frames until [`flush`](QueuedSender::flush).
///
/// Used where a batch of messages should leave together, e.g. several
/// barrier updates produced by one local decision.
pub struct QueuedSender<S> {
    inner: S,
    queue: Mutex<Vec<Frame>>,
    flushing: tokio::sync::Mutex<()>,
}

impl<S: Sender> QueuedSender<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, queue: Mutex::new(Vec::new()), flushing: tokio::sync::Mutex::new(()) }
    }

    /// Encode a message and hold it for the next flush.
    pub fn queue(&self, message: &Message) -> Result<(), CommunicationError> {
        let frame = Frame::encode(message)?;
        self.queue.lock().push(frame);
        Ok(())
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Write every queued frame in order.
    ///
    /// Stops at the first failure; frames after it are dropped.
    pub async fn flush(&self) -> Result<(), CommunicationError> {
        let _flushing = self.flushing.lock().await;
        self.write_queued().await
    }

    // Caller holds `flushing`.
    async fn write_queued(&self) -> Result<(), CommunicationError> {
        let frames = std::mem::take(&mut *self.queue.lock());
        for frame in &frames {
            self.inner.send_frame(frame).await?;
        }
        Ok(())
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Sender> Sender for QueuedSender<S> {
    /// Writes anything already queued, then `frame`. An `Ok` means `frame`
    /// itself reached the inner sender.
    async fn send_frame(&self, frame: &Frame) -> Result<(), CommunicationError> {
        let _flushing = self.flushing.lock().await;
        self.queue.lock().push(frame.clone());
        self.write_queued().await
    }

    async fn shutdown(&self) {
        if let Err(e) = self.flush().await {
            debug!("queued frames lost at shutdown: {}", e);
        }
        self.inner.shutdown().await;
    }
}

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;
