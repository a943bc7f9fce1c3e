// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport errors

use drover_wire::ProtocolError;
use thiserror::Error;

use crate::fan_out::SenderId;

/// Errors crossing the transport boundary.
#[derive(Debug, Error)]
pub enum CommunicationError {
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("endpoint is shut down")]
    Shutdown,

    #[error("peer fell {queued} frames behind")]
    Lagging { queued: usize },

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

/// Some senders of a broadcast failed; the rest received the message.
#[derive(Debug, Error)]
#[error("broadcast failed for {} of {} senders", failed.len(), failed.len() + delivered)]
pub struct BroadcastError {
    pub failed: Vec<(SenderId, CommunicationError)>,
    pub delivered: usize,
}

impl BroadcastError {
    pub fn failed_ids(&self) -> impl Iterator<Item = SenderId> + '_ {
        self.failed.iter().map(|(id, _)| *id)
    }
}
