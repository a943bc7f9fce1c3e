// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use drover_comm::CommunicationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BarrierError {
    #[error("no free barrier in group {name}")]
    NoFreeBarrier { name: String },

    #[error("barrier {name} already has an outstanding wait")]
    AlreadyWaiting { name: String },

    #[error("barrier registry is shut down")]
    Closed,

    #[error(transparent)]
    Communication(#[from] CommunicationError),
}
