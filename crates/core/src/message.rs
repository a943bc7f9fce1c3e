// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol messages exchanged between console, agents, and workers.
//!
//! Every message that crosses a connection is one variant of [`Message`].
//! Routing code matches on it exhaustively, so adding a kind is a compile
//! error everywhere a decision has to be made about it.

use crate::identity::{BarrierIdentity, WorkerIdentity};
use serde::{Deserialize, Serialize};

/// Lifecycle state a worker process reports to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Started,
    Running,
    Finished,
}

crate::simple_display! {
    ProcessState {
        Started => "started",
        Running => "running",
        Finished => "finished",
    }
}

/// A protocol message.
///
/// Serializes with `{"type": "kind:name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Sent by an agent to each worker it serves before anything else
    #[serde(rename = "process:initialise")]
    Initialise {
        /// Worker should wait for `Start` before running its script
        wait_for_start: bool,
        /// Worker should open a report connection to the console
        report_to_console: bool,
    },

    #[serde(rename = "process:start")]
    Start,

    #[serde(rename = "process:reset")]
    Reset,

    #[serde(rename = "process:stop")]
    Stop,

    #[serde(rename = "process:status")]
    ReportStatus {
        worker: WorkerIdentity,
        state: ProcessState,
        running_threads: u32,
        total_threads: u32,
    },

    /// Terminal marker written when a sender shuts down
    #[serde(rename = "comm:close")]
    CloseCommunication,

    /// A party will take part in barrier `name`; capacity grows by one
    #[serde(rename = "barrier:add")]
    AddBarrier { worker: WorkerIdentity, name: String },

    /// Parties that will never arrive; capacity shrinks by `number_of_barriers`
    #[serde(rename = "barrier:remove")]
    RemoveBarriers { worker: WorkerIdentity, name: String, number_of_barriers: u64 },

    #[serde(rename = "barrier:wait")]
    AddWaiter { worker: WorkerIdentity, name: String, barrier: BarrierIdentity },

    #[serde(rename = "barrier:cancel")]
    CancelWaiter { worker: WorkerIdentity, name: String, barrier: BarrierIdentity },

    /// Barrier `name` opened; `waiters` are released
    #[serde(rename = "barrier:open")]
    BarrierOpen { name: String, waiters: Vec<BarrierIdentity> },
}

impl Message {
    /// The serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Initialise { .. } => "process:initialise",
            Message::Start => "process:start",
            Message::Reset => "process:reset",
            Message::Stop => "process:stop",
            Message::ReportStatus { .. } => "process:status",
            Message::CloseCommunication => "comm:close",
            Message::AddBarrier { .. } => "barrier:add",
            Message::RemoveBarriers { .. } => "barrier:remove",
            Message::AddWaiter { .. } => "barrier:wait",
            Message::CancelWaiter { .. } => "barrier:cancel",
            Message::BarrierOpen { .. } => "barrier:open",
        }
    }

    /// The worker a message originates from, if it carries one.
    pub fn worker(&self) -> Option<&WorkerIdentity> {
        match self {
            Message::ReportStatus { worker, .. }
            | Message::AddBarrier { worker, .. }
            | Message::RemoveBarriers { worker, .. }
            | Message::AddWaiter { worker, .. }
            | Message::CancelWaiter { worker, .. } => Some(worker),
            Message::Initialise { .. }
            | Message::Start
            | Message::Reset
            | Message::Stop
            | Message::CloseCommunication
            | Message::BarrierOpen { .. } => None,
        }
    }

    /// The barrier name for barrier protocol messages.
    pub fn barrier_name(&self) -> Option<&str> {
        match self {
            Message::AddBarrier { name, .. }
            | Message::RemoveBarriers { name, .. }
            | Message::AddWaiter { name, .. }
            | Message::CancelWaiter { name, .. }
            | Message::BarrierOpen { name, .. } => Some(name),
            Message::Initialise { .. }
            | Message::Start
            | Message::Reset
            | Message::Stop
            | Message::ReportStatus { .. }
            | Message::CloseCommunication => None,
        }
    }

    pub fn is_barrier(&self) -> bool {
        self.barrier_name().is_some()
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Message::CloseCommunication)
    }

    /// One-line description for logs.
    pub fn log_summary(&self) -> String {
        let t = self.kind();
        match self {
            Message::Initialise { wait_for_start, report_to_console } => {
                format!("{t} wait_for_start={wait_for_start} report={report_to_console}")
            }
            Message::ReportStatus { worker, state, running_threads, total_threads } => {
                format!("{t} worker={worker} state={state} threads={running_threads}/{total_threads}")
            }
            Message::AddBarrier { worker, name } => format!("{t} worker={worker} name={name}"),
            Message::RemoveBarriers { worker, name, number_of_barriers } => {
                format!("{t} worker={worker} name={name} count={number_of_barriers}")
            }
            Message::AddWaiter { worker, name, barrier }
            | Message::CancelWaiter { worker, name, barrier } => {
                format!("{t} worker={worker} name={name} barrier={}", barrier.short(8))
            }
            Message::BarrierOpen { name, waiters } => {
                format!("{t} name={name} waiters={}", waiters.len())
            }
            Message::Start | Message::Reset | Message::Stop | Message::CloseCommunication => {
                t.to_string()
            }
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
