// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Default console port
pub const DEFAULT_CONSOLE_PORT: u16 = 6372;

/// Default agent port for worker connections
pub const DEFAULT_AGENT_PORT: u16 = 6373;

/// Console host agents and workers connect to (default `127.0.0.1`)
pub fn console_host() -> String {
    std::env::var("DROVER_CONSOLE_HOST")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

/// Interface the console listens on (default `0.0.0.0`, every interface)
pub fn console_bind() -> String {
    std::env::var("DROVER_CONSOLE_BIND")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "0.0.0.0".to_string())
}

/// Console listen/connect port
pub fn console_port() -> Result<u16, LifecycleError> {
    port("DROVER_CONSOLE_PORT", DEFAULT_CONSOLE_PORT)
}

/// Port the agent accepts worker connections on
pub fn agent_port() -> Result<u16, LifecycleError> {
    port("DROVER_AGENT_PORT", DEFAULT_AGENT_PORT)
}

fn port(var: &'static str, default: u16) -> Result<u16, LifecycleError> {
    match std::env::var(var) {
        Ok(value) => value.parse::<u16>().map_err(|_| LifecycleError::InvalidEnv { var, value }),
        Err(_) => Ok(default),
    }
}

/// Connect timeout for outbound connections (default 5s)
pub fn connect_timeout() -> Duration {
    millis("DROVER_CONNECT_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// Time an accepted peer has to send its connection type (default 5s)
pub fn handshake_timeout() -> Duration {
    millis("DROVER_HANDSHAKE_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

fn millis(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

/// Whether agents connect to the console at all (default true).
///
/// `0`, `false`, `no` and `off` disable it; the agent then runs its workers
/// with barriers local to each worker.
pub fn use_console() -> bool {
    match std::env::var("DROVER_USE_CONSOLE") {
        Ok(value) => !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"),
        Err(_) => true,
    }
}

/// Log filter directive (default `info`)
pub fn log_filter() -> String {
    std::env::var("DROVER_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "info".to_string())
}

/// Directory for daily rolling log files. Logs go to stderr when unset.
pub fn log_dir() -> Option<PathBuf> {
    std::env::var("DROVER_LOG_DIR").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
