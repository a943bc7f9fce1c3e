// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::acceptor::Acceptor;
use crate::client::{ClientReceiver, ClientSender};
use crate::connector::Connector;
use drover_core::test_support::{add_barrier, worker};
use drover_wire::ConnectionType;
use std::time::Duration;

async fn acceptor() -> Acceptor {
    Acceptor::bind("127.0.0.1:0", Duration::from_secs(2), &ConnectionType::ALL).await.unwrap()
}

fn connector(acceptor: &Acceptor, ty: ConnectionType) -> Connector {
    Connector::new("127.0.0.1", acceptor.local_addr().port(), ty)
}

async fn event(receiver: &ServerReceiver) -> ConnectionEvent {
    tokio::time::timeout(Duration::from_secs(2), receiver.next_event()).await.unwrap().unwrap()
}

async fn wait_for_len(sender: &ServerSender, len: usize) {
    for _ in 0..200 {
        if sender.len() == len {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {len} connections, have {}", sender.len());
}

#[tokio::test]
async fn receiver_reads_every_connection() {
    let acceptor = acceptor().await;
    let server = ServerReceiver::start(acceptor.take_queue(ConnectionType::Report).unwrap());

    let one = ClientSender::connect(&connector(&acceptor, ConnectionType::Report)).await.unwrap();
    one.send(&add_barrier(&worker(1), "start")).await.unwrap();
    let first = event(&server).await;

    let two = ClientSender::connect(&connector(&acceptor, ConnectionType::Report)).await.unwrap();
    two.send(&add_barrier(&worker(2), "start")).await.unwrap();
    let second = event(&server).await;

    let (ConnectionEvent::Message { connection: c1, message: m1 }, ConnectionEvent::Message { connection: c2, message: m2 }) =
        (first, second)
    else {
        panic!("expected two messages");
    };
    assert_ne!(c1, c2);
    assert_eq!(m1.worker(), Some(&worker(1)));
    assert_eq!(m2.worker(), Some(&worker(2)));
}

#[tokio::test]
async fn closed_follows_the_connections_messages() {
    let acceptor = acceptor().await;
    let server = ServerReceiver::start(acceptor.take_queue(ConnectionType::Report).unwrap());

    let client = ClientSender::connect(&connector(&acceptor, ConnectionType::Report)).await.unwrap();
    client.send(&Message::Start).await.unwrap();
    client.send(&Message::Stop).await.unwrap();
    client.shutdown().await;

    let ConnectionEvent::Message { connection, message } = event(&server).await else {
        panic!("expected a message first");
    };
    assert_eq!(message, Message::Start);
    assert_eq!(event(&server).await, ConnectionEvent::Message { connection, message: Message::Stop });
    assert_eq!(event(&server).await, ConnectionEvent::Closed { connection });
}

#[tokio::test]
async fn receiver_trait_skips_closed_events() {
    let acceptor = acceptor().await;
    let server = ServerReceiver::start(acceptor.take_queue(ConnectionType::Report).unwrap());

    let first = ClientSender::connect(&connector(&acceptor, ConnectionType::Report)).await.unwrap();
    first.send(&Message::Reset).await.unwrap();
    first.shutdown().await;
    let message = tokio::time::timeout(Duration::from_secs(2), server.receive()).await.unwrap();
    assert_eq!(message.unwrap(), Some(Message::Reset));

    let second = ClientSender::connect(&connector(&acceptor, ConnectionType::Report)).await.unwrap();
    second.send(&Message::Start).await.unwrap();
    let message = tokio::time::timeout(Duration::from_secs(2), server.receive()).await.unwrap();
    assert_eq!(message.unwrap(), Some(Message::Start));

    server.shutdown();
    assert_eq!(server.receive().await.unwrap(), None);
    server.close().await;
}

#[tokio::test]
async fn sender_broadcasts_to_every_connection() {
    let acceptor = acceptor().await;
    let server = ServerSender::start(acceptor.take_queue(ConnectionType::Control).unwrap());

    let a = ClientReceiver::connect(&connector(&acceptor, ConnectionType::Control)).await.unwrap();
    let b = ClientReceiver::connect(&connector(&acceptor, ConnectionType::Control)).await.unwrap();
    wait_for_len(&server, 2).await;

    server.send(&Message::Start).await.unwrap();
    assert_eq!(a.receive().await.unwrap(), Some(Message::Start));
    assert_eq!(b.receive().await.unwrap(), Some(Message::Start));

    server.shutdown().await;
    assert_eq!(a.receive().await.unwrap(), None);
    assert_eq!(b.receive().await.unwrap(), None);
    assert!(server.is_empty());
}

#[tokio::test]
async fn sender_drops_dead_connections() {
    let acceptor = acceptor().await;
    let server = ServerSender::start(acceptor.take_queue(ConnectionType::Control).unwrap());

    let alive = ClientReceiver::connect(&connector(&acceptor, ConnectionType::Control)).await.unwrap();
    let dead = ClientReceiver::connect(&connector(&acceptor, ConnectionType::Control)).await.unwrap();
    wait_for_len(&server, 2).await;
    drop(dead);

    // Writes to a reset socket fail after the peer's RST arrives.
    for _ in 0..100 {
        let _ = server.send(&Message::Reset).await;
        if server.len() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(server.len(), 1);
    assert_eq!(alive.receive().await.unwrap(), Some(Message::Reset));
}

#[tokio::test]
async fn greeting_precedes_broadcasts() {
    let acceptor = acceptor().await;
    let greeting = Message::Initialise { wait_for_start: true, report_to_console: false };
    let server = ServerSender::with_greeting(
        acceptor.take_queue(ConnectionType::Worker).unwrap(),
        greeting.clone(),
    );

    let client = ClientReceiver::connect(&connector(&acceptor, ConnectionType::Worker)).await.unwrap();
    wait_for_len(&server, 1).await;
    server.send(&Message::Start).await.unwrap();

    assert_eq!(client.receive().await.unwrap(), Some(greeting));
    assert_eq!(client.receive().await.unwrap(), Some(Message::Start));
}

#[tokio::test]
async fn slow_peer_does_not_hold_up_other_greetings() {
    let acceptor = acceptor().await;
    // Far larger than the socket buffers, so greeting a peer that never
    // reads cannot finish.
    let greeting = Message::BarrierOpen { name: "x".repeat(15_000_000), waiters: Vec::new() };
    let server = ServerSender::with_greeting(
        acceptor.take_queue(ConnectionType::Worker).unwrap(),
        greeting.clone(),
    );

    let socket = tokio::net::TcpSocket::new_v4().unwrap();
    socket.set_recv_buffer_size(4096).unwrap();
    let mut stalled = socket.connect(acceptor.local_addr()).await.unwrap();
    ConnectionType::Worker.write_to(&mut stalled).await.unwrap();

    let client = ClientReceiver::connect(&connector(&acceptor, ConnectionType::Worker)).await.unwrap();
    let greeted = tokio::time::timeout(Duration::from_secs(5), client.receive()).await.unwrap();
    assert_eq!(greeted.unwrap(), Some(greeting));
    wait_for_len(&server, 1).await;

    server.send(&Message::Start).await.unwrap();
    assert_eq!(client.receive().await.unwrap(), Some(Message::Start));
    assert_eq!(server.len(), 1);

    tokio::time::timeout(Duration::from_secs(2), server.shutdown()).await.unwrap();
    drop(stalled);
}
