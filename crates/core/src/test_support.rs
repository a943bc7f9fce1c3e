// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{BarrierIdentity, Message, WorkerIdentity};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for identities and messages.
pub mod strategies {
    use crate::{BarrierIdentity, Message, ProcessState, WorkerIdentity};
    use proptest::prelude::*;

    pub fn arb_worker_identity() -> impl Strategy<Value = WorkerIdentity> {
        ("[a-z][a-z0-9.-]{0,15}", any::<u32>(), any::<u32>(), "[A-Za-z0-9_-]{8}").prop_map(
            |(host, agent, worker, nonce)| WorkerIdentity {
                host: host.into(),
                agent,
                worker,
                nonce: nonce.into(),
            },
        )
    }

    pub fn arb_barrier_identity() -> impl Strategy<Value = BarrierIdentity> {
        "bar-[A-Za-z0-9_-]{19}".prop_map(BarrierIdentity::from_string)
    }

    pub fn arb_process_state() -> impl Strategy<Value = ProcessState> {
        prop_oneof![
            Just(ProcessState::Started),
            Just(ProcessState::Running),
            Just(ProcessState::Finished),
        ]
    }

    pub fn arb_message() -> impl Strategy<Value = Message> {
        let name = ".{0,24}";
        prop_oneof![
            (any::<bool>(), any::<bool>()).prop_map(|(wait_for_start, report_to_console)| {
                Message::Initialise { wait_for_start, report_to_console }
            }),
            Just(Message::Start),
            Just(Message::Reset),
            Just(Message::Stop),
            (arb_worker_identity(), arb_process_state(), any::<u32>(), any::<u32>()).prop_map(
                |(worker, state, running_threads, total_threads)| Message::ReportStatus {
                    worker,
                    state,
                    running_threads,
                    total_threads,
                }
            ),
            Just(Message::CloseCommunication),
            (arb_worker_identity(), name)
                .prop_map(|(worker, name)| Message::AddBarrier { worker, name }),
            (arb_worker_identity(), name, any::<u64>()).prop_map(
                |(worker, name, number_of_barriers)| Message::RemoveBarriers {
                    worker,
                    name,
                    number_of_barriers,
                }
            ),
            (arb_worker_identity(), name, arb_barrier_identity())
                .prop_map(|(worker, name, barrier)| Message::AddWaiter { worker, name, barrier }),
            (arb_worker_identity(), name, arb_barrier_identity()).prop_map(
                |(worker, name, barrier)| Message::CancelWaiter { worker, name, barrier }
            ),
            (name, proptest::collection::vec(arb_barrier_identity(), 0..8))
                .prop_map(|(name, waiters)| Message::BarrierOpen { name, waiters }),
        ]
    }
}

// ── Message factory functions ───────────────────────────────────────────

/// A worker identity with a fixed nonce, for predictable assertions.
pub fn worker(n: u32) -> WorkerIdentity {
    WorkerIdentity { nonce: format!("nonce{n:03}").into(), ..WorkerIdentity::new("test-host", 0, n) }
}

pub fn add_barrier(worker: &WorkerIdentity, name: &str) -> Message {
    Message::AddBarrier { worker: worker.clone(), name: name.to_string() }
}

pub fn remove_barriers(worker: &WorkerIdentity, name: &str, count: u64) -> Message {
    Message::RemoveBarriers {
        worker: worker.clone(),
        name: name.to_string(),
        number_of_barriers: count,
    }
}

pub fn add_waiter(worker: &WorkerIdentity, name: &str, barrier: &BarrierIdentity) -> Message {
    Message::AddWaiter { worker: worker.clone(), name: name.to_string(), barrier: barrier.clone() }
}

pub fn cancel_waiter(worker: &WorkerIdentity, name: &str, barrier: &BarrierIdentity) -> Message {
    Message::CancelWaiter {
        worker: worker.clone(),
        name: name.to_string(),
        barrier: barrier.clone(),
    }
}

pub fn barrier_open(name: &str, waiters: &[BarrierIdentity]) -> Message {
    Message::BarrierOpen { name: name.to_string(), waiters: waiters.to_vec() }
}
