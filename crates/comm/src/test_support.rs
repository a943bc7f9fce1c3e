// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake endpoints for tests in this and downstream crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use drover_core::Message;
use drover_wire::Frame;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::CommunicationError;
use crate::sender::Sender;

/// Records every message it is sent.
#[derive(Default)]
pub struct RecordingSender {
    messages: Mutex<Vec<Message>>,
    shut_down: AtomicBool,
    notify: Notify,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` messages have been recorded.
    ///
    /// Panics after five seconds so a broken test fails instead of hanging.
    #[allow(clippy::panic)]
    pub async fn wait_for(&self, count: usize) -> Vec<Message> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let notified = self.notify.notified();
            let messages = self.messages();
            if messages.len() >= count {
                return messages;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                panic!("expected {count} messages, got {messages:?}");
            }
        }
    }
}

#[async_trait]
impl Sender for RecordingSender {
    async fn send_frame(&self, frame: &Frame) -> Result<(), CommunicationError> {
        if self.is_shut_down() {
            return Err(CommunicationError::Shutdown);
        }
        let message = frame.decode()?;
        self.messages.lock().push(message);
        self.notify.notify_waiters();
        Ok(())
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

/// Fails every send.
#[derive(Default)]
pub struct FailingSender {
    attempts: AtomicUsize,
    shut_down: AtomicBool,
}

impl FailingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sender for FailingSender {
    async fn send_frame(&self, _frame: &Frame) -> Result<(), CommunicationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into())
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}
