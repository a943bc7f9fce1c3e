// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drover daemon library
//!
//! The console and agent processes, their configuration, and logging setup.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod agent;
mod console;
pub mod env;
pub mod lifecycle;
pub mod logging;

pub use agent::Agent;
pub use console::{send_control, Console};
pub use lifecycle::{Config, LifecycleError};
