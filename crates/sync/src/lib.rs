// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-sync: named barriers shared by worker threads across processes.
//!
//! Each worker process keeps a [`BarrierGroupRegistry`] and reports every
//! change up its report connection. The console's [`BarrierCoordinator`]
//! sums those reports per barrier name and broadcasts `BarrierOpen` once
//! every registered party is waiting.

mod barrier;
mod coordinator;
mod error;
mod group;
mod registry;
mod worker;

pub use barrier::Barrier;
pub use coordinator::BarrierCoordinator;
pub use error::BarrierError;
pub use group::BarrierGroup;
pub use registry::{BarrierGroupRegistry, PendingWait, WaitOutcome};
pub use worker::WorkerContext;
