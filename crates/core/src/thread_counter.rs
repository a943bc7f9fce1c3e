// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-thread accounting owned by a process context

use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counts {
    live: u32,
    total: u32,
}

/// Counts the worker threads of one process.
///
/// A thread counts as live from [`ThreadCounter::register`] until its
/// [`ThreadGuard`] is dropped, so "live" means created but not yet run to
/// completion. Clones share the same counts.
#[derive(Debug, Clone, Default)]
pub struct ThreadCounter {
    counts: Arc<Mutex<Counts>>,
}

impl ThreadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a thread. The count drops again when the guard is dropped.
    pub fn register(&self) -> ThreadGuard {
        let mut counts = self.counts.lock();
        counts.live += 1;
        counts.total += 1;
        ThreadGuard { counts: Arc::clone(&self.counts) }
    }

    /// Threads registered and not yet finished.
    pub fn live(&self) -> u32 {
        self.counts.lock().live
    }

    /// Threads ever registered.
    pub fn total(&self) -> u32 {
        self.counts.lock().total
    }
}

/// Keeps one thread registered with its [`ThreadCounter`].
#[derive(Debug)]
pub struct ThreadGuard {
    counts: Arc<Mutex<Counts>>,
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        let mut counts = self.counts.lock();
        counts.live = counts.live.saturating_sub(1);
    }
}

#[cfg(test)]
#[path = "thread_counter_tests.rs"]
mod tests;
