// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber registry for received messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use drover_core::Message;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::CommunicationError;
use crate::receiver::Receiver;

/// Something that wants to see received messages.
///
/// Handlers run on the dispatching task and must not block.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: &Message);
}

impl<F> MessageHandler for F
where
    F: Fn(&Message) + Send + Sync,
{
    fn handle(&self, message: &Message) {
        self(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Delivers each message to every subscribed handler.
///
/// Delivery iterates a snapshot of the subscribers taken under the lock, so a
/// handler may subscribe or unsubscribe from inside `handle`.
#[derive(Default)]
pub struct MessageDispatcher {
    handlers: Mutex<Vec<(SubscriptionId, Arc<dyn MessageHandler>)>>,
    next_id: AtomicU64,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: Arc<dyn MessageHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, handler));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(sid, _)| *sid != id);
        handlers.len() != before
    }

    pub fn dispatch(&self, message: &Message) {
        let snapshot = self.handlers.lock().clone();
        for (_, handler) in snapshot {
            handler.handle(message);
        }
    }

    /// Dispatch everything `receiver` yields until it closes.
    pub async fn run(&self, receiver: &dyn Receiver) -> Result<(), CommunicationError> {
        while let Some(message) = receiver.receive().await? {
            debug!("dispatch {}", message.log_summary());
            self.dispatch(&message);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
