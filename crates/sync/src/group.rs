// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-local state of one named barrier.

use std::collections::BTreeSet;

use drover_core::BarrierIdentity;

use crate::error::BarrierError;

/// Capacity and current waiters of one barrier name.
///
/// A group is ready to open once it has a waiter and at least as many
/// waiters as barriers. Capacity drops only through
/// [`remove_barriers`](BarrierGroup::remove_barriers), so a group that
/// reaches zero with waiters left releases them instead of stranding them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierGroup {
    name: String,
    barriers: u64,
    waiters: BTreeSet<BarrierIdentity>,
}

impl BarrierGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), barriers: 0, waiters: BTreeSet::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn barriers(&self) -> u64 {
        self.barriers
    }

    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    pub fn add_barrier(&mut self) {
        self.barriers += 1;
    }

    /// Drop up to `count` barriers; returns how many were dropped.
    pub fn remove_barriers(&mut self, count: u64) -> u64 {
        let removed = count.min(self.barriers);
        self.barriers -= removed;
        removed
    }

    /// Register a waiter. Each waiter needs a barrier nobody is waiting on.
    pub fn add_waiter(&mut self, id: BarrierIdentity) -> Result<(), BarrierError> {
        if self.waiters.len() as u64 >= self.barriers {
            return Err(BarrierError::NoFreeBarrier { name: self.name.clone() });
        }
        self.waiters.insert(id);
        Ok(())
    }

    pub fn contains(&self, id: &BarrierIdentity) -> bool {
        self.waiters.contains(id)
    }

    /// Remove a waiter that has not been released yet.
    pub fn remove_waiter(&mut self, id: &BarrierIdentity) -> bool {
        self.waiters.remove(id)
    }

    pub fn is_ready(&self) -> bool {
        !self.waiters.is_empty() && self.waiters.len() as u64 >= self.barriers
    }

    /// Release every waiter, leaving capacity for the next round.
    pub fn open(&mut self) -> Vec<BarrierIdentity> {
        std::mem::take(&mut self.waiters).into_iter().collect()
    }

    /// No barriers and no waiters; the group can be forgotten.
    pub fn is_empty(&self) -> bool {
        self.barriers == 0 && self.waiters.is_empty()
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
