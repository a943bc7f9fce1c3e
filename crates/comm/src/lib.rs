// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-comm: message endpoints over TCP and in-process channels.
//!
//! Connections are opened by a [`Connector`] and accepted by an [`Acceptor`],
//! which sorts them by [`ConnectionType`](drover_wire::ConnectionType).
//! Everything above the socket speaks [`Sender`] and [`Receiver`]: a
//! [`FanOutSender`] replicates one encoded frame to many senders, a
//! [`MessagePump`] relays a receiver into senders, and a
//! [`MessageDispatcher`] hands received messages to subscribers.

mod acceptor;
mod channel;
mod client;
mod connector;
mod dispatch;
mod error;
mod fan_out;
mod pump;
mod receiver;
mod sender;
mod server;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use acceptor::{Accepted, AcceptedQueue, Acceptor, ConnectionId};
pub use channel::{channel, ChannelReceiver, ChannelSender};
pub use client::{ClientReceiver, ClientSender};
pub use connector::Connector;
pub use dispatch::{MessageDispatcher, MessageHandler, SubscriptionId};
pub use error::{BroadcastError, CommunicationError};
pub use fan_out::{FanOutSender, SenderId};
pub use pump::{MessagePump, PumpState};
pub use receiver::{Receiver, StreamReceiver};
pub use sender::{QueuedSender, Sender, StreamSender};
pub use server::{ConnectionEvent, ServerReceiver, ServerSender};
