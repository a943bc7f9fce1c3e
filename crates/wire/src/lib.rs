// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for drover connections.
//!
//! Every connection starts with a 4-byte big-endian [`ConnectionType`] tag.
//! After that the stream is a sequence of frames: 4-byte length prefix
//! (big-endian) + JSON payload.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod connection_type;
mod wire;

pub use connection_type::{ConnectionType, TAG_LEN};
pub use wire::{
    decode, encode, read_frame, read_message, read_message_timeout, write_frame, write_message,
    Frame, ProtocolError, MAX_MESSAGE_SIZE,
};
