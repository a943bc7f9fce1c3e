// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-core: identities and message types shared by every drover process

pub mod macros;

pub mod identity;
pub mod message;
pub mod thread_counter;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use identity::{BarrierIdentity, WorkerIdentity};
pub use message::{Message, ProcessState};
pub use thread_counter::{ThreadCounter, ThreadGuard};
