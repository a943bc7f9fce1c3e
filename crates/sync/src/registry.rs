// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side barrier registry.
//!
//! Tracks every barrier group the worker's threads take part in and mirrors
//! each change to the console over the report sender. The console decides
//! when a group opens and broadcasts `BarrierOpen`, which comes back through
//! [`handle`](BarrierGroupRegistry::handle) and releases the local waiters it
//! names.
//!
//! Without a report sender the registry makes the open decision itself, so
//! barriers only span the threads of this process.
//!
//! The state lock is never held across an await. Each waiter owns a one-shot
//! channel; whichever of cancel and open removes it from `pending` first
//! decides its outcome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use drover_comm::{MessageHandler, Sender};
use drover_core::{BarrierIdentity, Message, WorkerIdentity};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::BarrierError;
use crate::group::BarrierGroup;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Opened,
    Cancelled,
}

drover_core::simple_display! {
    WaitOutcome {
        Opened => "opened",
        Cancelled => "cancelled",
    }
}

/// A registered waiter that has not been awaited yet.
#[derive(Debug)]
pub struct PendingWait {
    id: BarrierIdentity,
    name: String,
    rx: Option<oneshot::Receiver<WaitOutcome>>,
    outcome: Option<WaitOutcome>,
}

impl PendingWait {
    pub fn id(&self) -> &BarrierIdentity {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait until the barrier opens or the wait is cancelled.
    pub async fn wait(mut self) -> WaitOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        match self.rx.take() {
            // A dropped sender means the registry went away.
            Some(rx) => rx.await.unwrap_or(WaitOutcome::Cancelled),
            None => WaitOutcome::Cancelled,
        }
    }

    /// Wait at most `timeout`. `None` leaves the wait registered.
    pub async fn wait_for(&mut self, timeout: Duration) -> Option<WaitOutcome> {
        if self.outcome.is_some() {
            return self.outcome;
        }
        let rx = self.rx.as_mut()?;
        let outcome = tokio::time::timeout(timeout, rx).await.ok()?;
        self.rx = None;
        self.outcome = Some(outcome.unwrap_or(WaitOutcome::Cancelled));
        self.outcome
    }
}

struct Waiter {
    name: String,
    tx: oneshot::Sender<WaitOutcome>,
}

#[derive(Default)]
struct State {
    groups: HashMap<String, BarrierGroup>,
    pending: HashMap<BarrierIdentity, Waiter>,
    closed: bool,
}

impl State {
    fn group(&mut self, name: &str) -> &mut BarrierGroup {
        self.groups.entry(name.to_string()).or_insert_with(|| BarrierGroup::new(name))
    }

    /// Release `ids` from group `name`; ids not waiting here are skipped.
    fn release(&mut self, name: &str, ids: &[BarrierIdentity]) -> usize {
        let Some(group) = self.groups.get_mut(name) else {
            return 0;
        };
        let mut released = 0;
        for id in ids {
            if !group.remove_waiter(id) {
                continue;
            }
            if let Some(waiter) = self.pending.remove(id) {
                let _ = waiter.tx.send(WaitOutcome::Opened);
                released += 1;
            }
        }
        self.collect(name);
        released
    }

    /// Open `name` if it is ready. Only used when deciding locally.
    fn open_if_ready(&mut self, name: &str) {
        let ids = match self.groups.get_mut(name) {
            Some(group) if group.is_ready() => group.open(),
            _ => return,
        };
        for id in &ids {
            if let Some(waiter) = self.pending.remove(id) {
                let _ = waiter.tx.send(WaitOutcome::Opened);
            }
        }
        debug!("barrier {} opened locally for {} waiters", name, ids.len());
    }

    fn collect(&mut self, name: &str) {
        if self.groups.get(name).is_some_and(BarrierGroup::is_empty) {
            self.groups.remove(name);
        }
    }
}

pub struct BarrierGroupRegistry {
    worker: WorkerIdentity,
    upstream: Option<Arc<dyn Sender>>,
    state: Mutex<State>,
    warned_local: AtomicBool,
}

impl BarrierGroupRegistry {
    /// A registry that reports to the console through `upstream`, or decides
    /// locally when there is none.
    pub fn new(worker: WorkerIdentity, upstream: Option<Arc<dyn Sender>>) -> Self {
        Self { worker, upstream, state: Mutex::new(State::default()), warned_local: AtomicBool::new(false) }
    }

    pub fn worker(&self) -> &WorkerIdentity {
        &self.worker
    }

    /// True when open decisions are made in this process.
    pub fn is_local(&self) -> bool {
        self.upstream.is_none()
    }

    /// `(barriers, waiting)` for a group, if it exists.
    pub fn snapshot(&self, name: &str) -> Option<(u64, usize)> {
        self.state.lock().groups.get(name).map(|g| (g.barriers(), g.waiting()))
    }

    async fn report(&self, message: Message) -> Result<(), BarrierError> {
        match &self.upstream {
            Some(upstream) => {
                upstream.send(&message).await?;
                Ok(())
            }
            None => {
                if !self.warned_local.swap(true, Ordering::Relaxed) {
                    warn!("no console connection, barriers are local to {}", self.worker);
                }
                Ok(())
            }
        }
    }

    /// One more party will take part in `name`.
    pub async fn add_barrier(&self, name: &str) -> Result<(), BarrierError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(BarrierError::Closed);
            }
            state.group(name).add_barrier();
        }
        let result =
            self.report(Message::AddBarrier { worker: self.worker.clone(), name: name.to_string() }).await;
        if result.is_err() {
            let mut state = self.state.lock();
            state.group(name).remove_barriers(1);
            state.collect(name);
        }
        result
    }

    /// Drop up to `count` parties from `name`; returns how many were dropped.
    pub async fn remove_barriers(&self, name: &str, count: u64) -> Result<u64, BarrierError> {
        let removed = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(BarrierError::Closed);
            }
            let Some(group) = state.groups.get_mut(name) else {
                warn!("remove {} from unknown barrier {}", count, name);
                return Ok(0);
            };
            let removed = group.remove_barriers(count);
            if removed < count {
                warn!("barrier {} has only {} barriers, cannot remove {}", name, removed, count);
            }
            if self.is_local() {
                state.open_if_ready(name);
            }
            state.collect(name);
            removed
        };
        if removed > 0 {
            self.report(Message::RemoveBarriers {
                worker: self.worker.clone(),
                name: name.to_string(),
                number_of_barriers: removed,
            })
            .await?;
        }
        Ok(removed)
    }

    /// Register a waiter on `name`.
    ///
    /// The returned wait resolves when the group opens or the waiter is
    /// cancelled.
    pub async fn add_waiter(&self, name: &str) -> Result<PendingWait, BarrierError> {
        let id = BarrierIdentity::new();
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(BarrierError::Closed);
            }
            let group = state
                .groups
                .get_mut(name)
                .ok_or_else(|| BarrierError::NoFreeBarrier { name: name.to_string() })?;
            group.add_waiter(id.clone())?;
            state.pending.insert(id.clone(), Waiter { name: name.to_string(), tx });
            if self.is_local() {
                state.open_if_ready(name);
            }
        }

        let reported = self
            .report(Message::AddWaiter {
                worker: self.worker.clone(),
                name: name.to_string(),
                barrier: id.clone(),
            })
            .await;
        if let Err(e) = reported {
            let mut state = self.state.lock();
            state.pending.remove(&id);
            if let Some(group) = state.groups.get_mut(name) {
                group.remove_waiter(&id);
            }
            state.collect(name);
            return Err(e);
        }

        Ok(PendingWait { id, name: name.to_string(), rx: Some(rx), outcome: None })
    }

    /// Register a waiter and wait for it.
    pub async fn wait_on(&self, name: &str) -> Result<(BarrierIdentity, WaitOutcome), BarrierError> {
        let pending = self.add_waiter(name).await?;
        let id = pending.id().clone();
        Ok((id, pending.wait().await))
    }

    /// Cancel a waiter that has not been released.
    ///
    /// Returns `false` when the waiter already resolved. The local cancel
    /// stands even if reporting it fails.
    pub async fn cancel_waiter(&self, id: &BarrierIdentity) -> Result<bool, BarrierError> {
        let name = {
            let mut state = self.state.lock();
            let Some(waiter) = state.pending.remove(id) else {
                return Ok(false);
            };
            if let Some(group) = state.groups.get_mut(&waiter.name) {
                group.remove_waiter(id);
            }
            let _ = waiter.tx.send(WaitOutcome::Cancelled);
            state.collect(&waiter.name);
            waiter.name
        };
        self.report(Message::CancelWaiter { worker: self.worker.clone(), name, barrier: id.clone() })
            .await?;
        Ok(true)
    }

    /// Resolve every outstanding waiter as cancelled and refuse further use.
    pub fn shutdown(&self) {
        let waiters: Vec<Waiter> = {
            let mut state = self.state.lock();
            state.closed = true;
            for group in state.groups.values_mut() {
                group.open();
            }
            state.groups.retain(|_, g| !g.is_empty());
            state.pending.drain().map(|(_, w)| w).collect()
        };
        for waiter in waiters {
            let _ = waiter.tx.send(WaitOutcome::Cancelled);
        }
    }
}

impl MessageHandler for BarrierGroupRegistry {
    fn handle(&self, message: &Message) {
        match message {
            Message::BarrierOpen { name, waiters } => {
                let released = self.state.lock().release(name, waiters);
                if released > 0 {
                    debug!("barrier {} opened, released {} local waiters", name, released);
                } else {
                    debug!("barrier {} opened with no local waiters", name);
                }
            }
            Message::AddBarrier { .. }
            | Message::RemoveBarriers { .. }
            | Message::AddWaiter { .. }
            | Message::CancelWaiter { .. } => {
                warn!("unexpected {} at worker {}", message.kind(), self.worker);
            }
            Message::Initialise { .. }
            | Message::Start
            | Message::Reset
            | Message::Stop
            | Message::ReportStatus { .. }
            | Message::CloseCommunication => {}
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
