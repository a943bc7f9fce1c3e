// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Console-side barrier coordinator.
//!
//! Sums the barrier reports of every worker per barrier name and decides
//! when a group opens. Capacity is the total of the workers' barrier counts;
//! a group opens once it has waiters and at least as many as its capacity.
//! Opening broadcasts `BarrierOpen` with the released waiters, clears them,
//! and keeps the capacity for the next round.
//!
//! Workers are bound to the connection their reports arrive on. When that
//! connection closes, every barrier its workers held is removed as if they
//! had sent `RemoveBarriers`, and their waiters are dropped, so the rest of
//! the group is never left waiting on a dead process.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use drover_comm::{ConnectionEvent, ConnectionId, Sender, ServerReceiver};
use drover_core::{BarrierIdentity, Message, WorkerIdentity};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Group {
    barriers: BTreeMap<WorkerIdentity, u64>,
    waiters: BTreeMap<BarrierIdentity, WorkerIdentity>,
}

impl Group {
    fn capacity(&self) -> u64 {
        self.barriers.values().sum()
    }

    fn waiting_for(&self, worker: &WorkerIdentity) -> u64 {
        self.waiters.values().filter(|w| *w == worker).count() as u64
    }

    fn is_ready(&self) -> bool {
        !self.waiters.is_empty() && self.waiters.len() as u64 >= self.capacity()
    }

    fn is_empty(&self) -> bool {
        self.barriers.is_empty() && self.waiters.is_empty()
    }

    fn remove_barriers(&mut self, name: &str, worker: &WorkerIdentity, count: u64) {
        let held = self.barriers.get(worker).copied().unwrap_or(0);
        if count > held {
            warn!("{} removes {} from barrier {} but holds {}", worker, count, name, held);
        }
        let left = held.saturating_sub(count);
        if left == 0 {
            self.barriers.remove(worker);
        } else {
            self.barriers.insert(worker.clone(), left);
        }
    }
}

#[derive(Default)]
struct State {
    groups: HashMap<String, Group>,
    connections: HashMap<ConnectionId, BTreeSet<WorkerIdentity>>,
}

impl State {
    fn bind(&mut self, connection: Option<ConnectionId>, worker: &WorkerIdentity) {
        if let Some(connection) = connection {
            self.connections.entry(connection).or_default().insert(worker.clone());
        }
    }

    fn apply(&mut self, message: &Message) -> Option<Message> {
        let name = match message {
            Message::AddBarrier { worker, name } => {
                let group = self.groups.entry(name.clone()).or_default();
                *group.barriers.entry(worker.clone()).or_insert(0) += 1;
                name
            }
            Message::RemoveBarriers { worker, name, number_of_barriers } => {
                let Some(group) = self.groups.get_mut(name) else {
                    warn!("{} removes {} from unknown barrier {}", worker, number_of_barriers, name);
                    return None;
                };
                group.remove_barriers(name, worker, *number_of_barriers);
                name
            }
            Message::AddWaiter { worker, name, barrier } => {
                let group = self.groups.entry(name.clone()).or_default();
                let held = group.barriers.get(worker).copied().unwrap_or(0);
                if group.waiting_for(worker) >= held {
                    warn!("{} waits on barrier {} with no free barrier, ignoring", worker, name);
                    return None;
                }
                group.waiters.insert(barrier.clone(), worker.clone());
                name
            }
            Message::CancelWaiter { worker, name, barrier } => {
                if let Some(group) = self.groups.get_mut(name) {
                    if group.waiters.remove(barrier).is_none() {
                        debug!("{} cancels unknown waiter {} on {}", worker, barrier.short(8), name);
                    }
                }
                name
            }
            Message::BarrierOpen { name, .. } => {
                warn!("unexpected barrier:open for {} at the console", name);
                return None;
            }
            Message::Initialise { .. }
            | Message::Start
            | Message::Reset
            | Message::Stop
            | Message::ReportStatus { .. }
            | Message::CloseCommunication => return None,
        };
        self.open_if_ready(name)
    }

    fn open_if_ready(&mut self, name: &str) -> Option<Message> {
        let group = self.groups.get_mut(name)?;
        let opened = if group.is_ready() {
            let waiters: Vec<BarrierIdentity> = std::mem::take(&mut group.waiters).into_keys().collect();
            info!("barrier {} opens for {} waiters", name, waiters.len());
            Some(Message::BarrierOpen { name: name.to_string(), waiters })
        } else {
            None
        };
        if group.is_empty() {
            self.groups.remove(name);
        }
        opened
    }

    /// Forget every worker bound to `connection`, returning the opens this
    /// causes.
    fn drop_connection(&mut self, connection: ConnectionId) -> Vec<Message> {
        let Some(workers) = self.connections.remove(&connection) else {
            return Vec::new();
        };
        let names: Vec<String> = self.groups.keys().cloned().collect();
        let mut opened = Vec::new();
        for name in names {
            let Some(group) = self.groups.get_mut(&name) else {
                continue;
            };
            let mut touched = false;
            for worker in &workers {
                let before = group.waiters.len();
                group.waiters.retain(|_, w| w != worker);
                touched |= group.waiters.len() != before;
                if let Some(held) = group.barriers.remove(worker) {
                    info!("{} gone from {}, removing {} barriers from {}", worker, connection, held, name);
                    touched = true;
                }
            }
            if touched {
                opened.extend(self.open_if_ready(&name));
            }
        }
        opened
    }
}

pub struct BarrierCoordinator {
    broadcast: Arc<dyn Sender>,
    state: Mutex<State>,
}

impl BarrierCoordinator {
    /// Coordinator that announces opens on `broadcast`.
    pub fn new(broadcast: Arc<dyn Sender>) -> Self {
        Self { broadcast, state: Mutex::new(State::default()) }
    }

    /// `(capacity, waiting)` for a barrier name, if anyone registered it.
    pub fn snapshot(&self, name: &str) -> Option<(u64, usize)> {
        self.state.lock().groups.get(name).map(|g| (g.capacity(), g.waiters.len()))
    }

    /// Apply one message that arrived on `connection`.
    ///
    /// Messages without barrier meaning are ignored.
    pub async fn handle(&self, connection: Option<ConnectionId>, message: &Message) {
        let opened = {
            let mut state = self.state.lock();
            if let (true, Some(worker)) = (message.is_barrier(), message.worker()) {
                state.bind(connection, worker);
            }
            state.apply(message)
        };
        if let Some(open) = opened {
            self.announce(&open).await;
        }
    }

    /// The connection is gone; so are the barriers of every worker on it.
    pub async fn connection_closed(&self, connection: ConnectionId) {
        let opened = self.state.lock().drop_connection(connection);
        for open in &opened {
            self.announce(open).await;
        }
    }

    /// Feed events from `receiver` until it closes.
    pub async fn run(&self, receiver: &ServerReceiver) {
        while let Some(event) = receiver.next_event().await {
            match event {
                ConnectionEvent::Message { connection, message } => {
                    self.handle(Some(connection), &message).await;
                }
                ConnectionEvent::Closed { connection } => self.connection_closed(connection).await,
            }
        }
    }

    async fn announce(&self, open: &Message) {
        if let Err(e) = self.broadcast.send(open).await {
            warn!("failed to broadcast {}: {}", open.log_summary(), e);
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
