// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::lifecycle::{Config, LifecycleError};

/// Install the global subscriber.
///
/// Logs go to stderr, or to a daily rolling `{name}.log` in the configured
/// log directory. The returned guard flushes the file writer on drop and
/// must be held for the life of the process.
pub fn init(config: &Config, name: &str) -> Result<Option<WorkerGuard>, LifecycleError> {
    let filter = EnvFilter::try_new(&config.log_filter).map_err(|e| LifecycleError::Logging(e.to_string()))?;
    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{name}.log"));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| LifecycleError::Logging(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| LifecycleError::Logging(e.to_string()))?;
            Ok(None)
        }
    }
}
