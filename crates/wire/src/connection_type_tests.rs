// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Cursor;
use yare::parameterized;

#[parameterized(
    control = { ConnectionType::Control, 0 },
    report = { ConnectionType::Report, 1 },
    agent = { ConnectionType::Agent, 2 },
    worker = { ConnectionType::Worker, 3 },
    console_client = { ConnectionType::ConsoleClient, 4 },
)]
fn tag_values(ty: ConnectionType, tag: u32) {
    assert_eq!(ty.tag(), tag);
    assert_eq!(ConnectionType::from_tag(tag).unwrap(), ty);
}

#[test]
fn unknown_tag_is_rejected() {
    let err = ConnectionType::from_tag(0xdead_beef).unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownConnectionType(0xdead_beef)));
}

#[tokio::test]
async fn tag_is_four_bytes_big_endian() {
    let mut buffer = Vec::new();
    ConnectionType::Worker.write_to(&mut buffer).await.unwrap();
    assert_eq!(buffer, vec![0, 0, 0, 3]);
    assert_eq!(buffer.len(), TAG_LEN);
}

#[tokio::test]
async fn every_type_reads_back() {
    for ty in ConnectionType::ALL {
        let mut buffer = Vec::new();
        ty.write_to(&mut buffer).await.unwrap();
        let read = ConnectionType::read_from(&mut Cursor::new(buffer)).await.unwrap();
        assert_eq!(read, ty);
    }
}

#[tokio::test]
async fn tag_leaves_following_bytes_unread() {
    let mut buffer = Vec::new();
    ConnectionType::Report.write_to(&mut buffer).await.unwrap();
    buffer.extend_from_slice(b"rest");

    let mut cursor = Cursor::new(buffer);
    ConnectionType::read_from(&mut cursor).await.unwrap();
    assert_eq!(cursor.position(), TAG_LEN as u64);
}

#[tokio::test]
async fn short_tag_is_truncated() {
    let err = ConnectionType::read_from(&mut Cursor::new(vec![0u8, 0, 1])).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Truncated { expected: 4, received: 3 }));
}

#[tokio::test]
async fn missing_tag_is_connection_closed() {
    let err = ConnectionType::read_from(&mut Cursor::new(Vec::new())).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[test]
fn display_names() {
    assert_eq!(ConnectionType::ConsoleClient.to_string(), "console-client");
    assert_eq!(ConnectionType::Report.to_string(), "report");
}
