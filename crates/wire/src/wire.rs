// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame encoding and decoding.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use drover_core::Message;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum message size (16 MB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

const PREFIX_LEN: usize = 4;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Truncated: expected {expected} bytes, got {received}")]
    Truncated { expected: usize, received: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,

    #[error("Unknown connection type tag {0:#010x}")]
    UnknownConnectionType(u32),
}

/// Encode a value to JSON bytes (without length prefix)
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode JSON bytes to a value
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Fill `buf` completely.
///
/// Returns `Ok(false)` on EOF before any byte was read, `Truncated` on EOF
/// after a partial read. Short reads are retried, so a frame split across
/// any number of TCP segments is reassembled here.
pub(crate) async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<bool, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(ProtocolError::Truncated { expected: buf.len(), received: filled });
        }
        filled += n;
    }
    Ok(true)
}

/// Read one length-prefixed payload.
///
/// EOF at a frame boundary is `ConnectionClosed`.
pub async fn read_message<R>(reader: &mut R) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; PREFIX_LEN];
    if !read_full(reader, &mut len_buf).await? {
        return Err(ProtocolError::ConnectionClosed);
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: len, max: MAX_MESSAGE_SIZE });
    }

    let mut payload = vec![0u8; len];
    match read_full(reader, &mut payload).await {
        Ok(true) => Ok(payload),
        // Zero-length payloads never reach here with `false`; a non-empty
        // payload with nothing after its prefix is a truncated frame.
        Ok(false) => Err(ProtocolError::Truncated { expected: len, received: 0 }),
        Err(e) => Err(e),
    }
}

/// Read one length-prefixed payload, failing with `Timeout` after `timeout`.
pub async fn read_message_timeout<R>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    tokio::time::timeout(timeout, read_message(reader)).await.map_err(|_| ProtocolError::Timeout)?
}

/// Write one length-prefixed payload and flush.
pub async fn write_message<W>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = Frame::from_payload(payload)?;
    write_frame(writer, &frame).await
}

/// An encoded, length-prefixed message.
///
/// Encoding happens once; clones share the bytes, so one frame can be
/// written to any number of streams.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(Arc<[u8]>);

impl Frame {
    /// Serialize a message into a frame.
    pub fn encode(message: &Message) -> Result<Self, ProtocolError> {
        Self::from_payload(&encode(message)?)
    }

    /// Wrap an already-serialized payload with its length prefix.
    pub fn from_payload(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let mut buf = Vec::with_capacity(PREFIX_LEN + payload.len());
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(payload);
        Ok(Self(buf.into()))
    }

    /// Prefix and payload, as written to the stream.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload without the length prefix.
    pub fn payload(&self) -> &[u8] {
        &self.0[PREFIX_LEN..]
    }

    /// Deserialize the payload.
    pub fn decode(&self) -> Result<Message, ProtocolError> {
        decode(self.payload())
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("payload_len", &self.payload().len()).finish()
    }
}

/// Write a frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame without decoding it.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let payload = read_message(reader).await?;
    Frame::from_payload(&payload)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
