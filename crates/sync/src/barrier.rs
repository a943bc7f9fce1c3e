// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script-facing barrier handle

use std::sync::Arc;
use std::time::Duration;

use drover_core::BarrierIdentity;
use parking_lot::Mutex;

use crate::error::BarrierError;
use crate::registry::{BarrierGroupRegistry, WaitOutcome};

#[derive(Debug)]
enum Slot {
    Idle,
    Registering,
    Waiting(BarrierIdentity),
    Closed,
}

/// One party's membership in a named barrier.
///
/// Creating a handle adds a barrier to the group; [`close`](Barrier::close)
/// removes it again. A handle has at most one wait outstanding.
pub struct Barrier {
    registry: Arc<BarrierGroupRegistry>,
    name: String,
    slot: Mutex<Slot>,
}

impl Barrier {
    pub async fn new(registry: Arc<BarrierGroupRegistry>, name: impl Into<String>) -> Result<Self, BarrierError> {
        let name = name.into();
        registry.add_barrier(&name).await?;
        Ok(Self { registry, name, slot: Mutex::new(Slot::Idle) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn begin(&self) -> Result<(), BarrierError> {
        let mut slot = self.slot.lock();
        match *slot {
            Slot::Idle => {
                *slot = Slot::Registering;
                Ok(())
            }
            Slot::Registering | Slot::Waiting(_) => {
                Err(BarrierError::AlreadyWaiting { name: self.name.clone() })
            }
            Slot::Closed => Err(BarrierError::Closed),
        }
    }

    /// Leave the slot idle unless the handle was closed meanwhile.
    fn finish(&self) {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Closed) {
            *slot = Slot::Idle;
        }
    }

    /// Wait until every party has arrived, or until cancelled.
    pub async fn wait(&self) -> Result<WaitOutcome, BarrierError> {
        self.begin()?;
        let pending = match self.registry.add_waiter(&self.name).await {
            Ok(pending) => pending,
            Err(e) => {
                self.finish();
                return Err(e);
            }
        };
        self.set_waiting(pending.id().clone());
        let outcome = pending.wait().await;
        self.finish();
        Ok(outcome)
    }

    /// Wait at most `timeout`. Returns `true` if the barrier opened; on
    /// timeout the wait is cancelled and `false` returned.
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<bool, BarrierError> {
        self.begin()?;
        let mut pending = match self.registry.add_waiter(&self.name).await {
            Ok(pending) => pending,
            Err(e) => {
                self.finish();
                return Err(e);
            }
        };
        let id = pending.id().clone();
        self.set_waiting(id.clone());

        let outcome = match pending.wait_for(timeout).await {
            Some(outcome) => outcome,
            None => match self.registry.cancel_waiter(&id).await {
                Ok(true) => WaitOutcome::Cancelled,
                // Released between the timeout and the cancel.
                Ok(false) => pending.wait().await,
                Err(e) => {
                    self.finish();
                    return Err(e);
                }
            },
        };
        self.finish();
        Ok(outcome == WaitOutcome::Opened)
    }

    fn set_waiting(&self, id: BarrierIdentity) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Registering) {
            *slot = Slot::Waiting(id);
        }
    }

    /// Cancel the outstanding wait, if any. Returns `true` if one was
    /// cancelled.
    pub async fn cancel(&self) -> Result<bool, BarrierError> {
        let id = match &*self.slot.lock() {
            Slot::Waiting(id) => id.clone(),
            Slot::Idle | Slot::Registering | Slot::Closed => return Ok(false),
        };
        self.registry.cancel_waiter(&id).await
    }

    /// Cancel any outstanding wait and remove this party from the group.
    /// Later calls are no-ops.
    pub async fn close(&self) -> Result<(), BarrierError> {
        let previous = std::mem::replace(&mut *self.slot.lock(), Slot::Closed);
        match previous {
            Slot::Closed => return Ok(()),
            Slot::Waiting(id) => {
                self.registry.cancel_waiter(&id).await?;
            }
            Slot::Idle | Slot::Registering => {}
        }
        self.registry.remove_barriers(&self.name, 1).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "barrier_tests.rs"]
mod tests;
