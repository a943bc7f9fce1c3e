// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker and barrier identities

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

crate::define_id! {
    /// A single registered waiter on a named barrier.
    ///
    /// Many waiters in many processes can wait on the same barrier name at
    /// once; each gets its own identity when it starts waiting, and the
    /// identity is consumed when that wait resolves.
    pub struct BarrierIdentity("bar-");
}

/// Identity of a worker process, stable for the worker's lifetime.
///
/// Equality and ordering cover every field, including the random nonce, so a
/// restarted worker that reuses the same host and ordinals is a different
/// party as far as barrier accounting is concerned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerIdentity {
    /// Host ID of the agent that serves the worker
    pub host: SmolStr,
    /// Agent ordinal on the host
    pub agent: u32,
    /// Worker ordinal within the agent
    pub worker: u32,
    /// Random suffix distinguishing worker incarnations
    pub nonce: SmolStr,
}

impl WorkerIdentity {
    /// Create an identity with a fresh nonce.
    pub fn new(host: impl Into<SmolStr>, agent: u32, worker: u32) -> Self {
        Self { host: host.into(), agent, worker, nonce: SmolStr::new(nanoid::nanoid!(8)) }
    }

    /// The `host-agent-worker` name used in logs and status reports.
    pub fn name(&self) -> String {
        format!("{}-{}-{}", self.host, self.agent, self.worker)
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.host, self.agent, self.worker)
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
