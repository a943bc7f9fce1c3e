// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection-type handshake tag

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::wire::{read_full, ProtocolError};

/// Width of the connection-type tag in bytes.
pub const TAG_LEN: usize = 4;

/// The logical channel a connection carries.
///
/// Written by the connecting side as the first [`TAG_LEN`] bytes of every
/// connection and fixed for the connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConnectionType {
    /// Console to agent control traffic
    Control,
    /// Worker to console reports and barrier requests
    Report,
    /// Agent registration with the console
    Agent,
    /// Agent to worker relay
    Worker,
    /// Programmatic console clients
    ConsoleClient,
}

drover_core::simple_display! {
    ConnectionType {
        Control => "control",
        Report => "report",
        Agent => "agent",
        Worker => "worker",
        ConsoleClient => "console-client",
    }
}

impl ConnectionType {
    pub const ALL: [ConnectionType; 5] = [
        ConnectionType::Control,
        ConnectionType::Report,
        ConnectionType::Agent,
        ConnectionType::Worker,
        ConnectionType::ConsoleClient,
    ];

    pub fn tag(self) -> u32 {
        match self {
            ConnectionType::Control => 0,
            ConnectionType::Report => 1,
            ConnectionType::Agent => 2,
            ConnectionType::Worker => 3,
            ConnectionType::ConsoleClient => 4,
        }
    }

    pub fn from_tag(tag: u32) -> Result<Self, ProtocolError> {
        match tag {
            0 => Ok(ConnectionType::Control),
            1 => Ok(ConnectionType::Report),
            2 => Ok(ConnectionType::Agent),
            3 => Ok(ConnectionType::Worker),
            4 => Ok(ConnectionType::ConsoleClient),
            other => Err(ProtocolError::UnknownConnectionType(other)),
        }
    }

    /// Write the tag and flush.
    pub async fn write_to<W>(self, writer: &mut W) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.tag().to_be_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read exactly one tag.
    ///
    /// EOF before the first byte is `ConnectionClosed`; EOF part-way through
    /// is `Truncated`.
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = [0u8; TAG_LEN];
        if !read_full(reader, &mut buf).await? {
            return Err(ProtocolError::ConnectionClosed);
        }
        Self::from_tag(u32::from_be_bytes(buf))
    }
}

#[cfg(test)]
#[path = "connection_type_tests.rs"]
mod tests;
