// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration and lifecycle errors.

use std::path::PathBuf;
use std::time::Duration;

use drover_comm::CommunicationError;
use thiserror::Error;

use crate::env;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host agents connect to the console on
    pub console_host: String,
    /// Interface the console listens on
    pub console_bind: String,
    /// Console port
    pub console_port: u16,
    /// Port agents accept worker connections on
    pub agent_port: u16,
    /// Outbound connect timeout
    pub connect_timeout: Duration,
    /// Inbound connection-type handshake timeout
    pub handshake_timeout: Duration,
    /// Agents connect to the console
    pub use_console: bool,
    /// Rolling log directory; stderr when `None`
    pub log_dir: Option<PathBuf>,
    /// Log filter directive
    pub log_filter: String,
}

impl Config {
    /// Snapshot the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self {
            console_host: env::console_host(),
            console_bind: env::console_bind(),
            console_port: env::console_port()?,
            agent_port: env::agent_port()?,
            connect_timeout: env::connect_timeout(),
            handshake_timeout: env::handshake_timeout(),
            use_console: env::use_console(),
            log_dir: env::log_dir(),
            log_filter: env::log_filter(),
        })
    }

    /// Where agents reach the console.
    pub fn console_address(&self) -> String {
        format!("{}:{}", self.console_host, self.console_port)
    }

    /// Where the console listens.
    pub fn console_bind_address(&self) -> String {
        format!("{}:{}", self.console_bind, self.console_port)
    }

    pub fn agent_address(&self) -> String {
        format!("127.0.0.1:{}", self.agent_port)
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Communication(#[from] CommunicationError),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
