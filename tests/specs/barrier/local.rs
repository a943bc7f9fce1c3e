// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Without a console, barriers span only the worker's own threads.

use std::sync::Arc;

use crate::prelude::*;

#[tokio::test]
async fn barriers_stay_in_process_without_console() {
    let agent = Agent::start(&config(0, false), true).await.unwrap();
    let worker = connect_worker(&agent, 0, WorkerIdentity::new("e2e", 0, 0)).await;

    assert!(!worker.waits_for_start());
    assert!(worker.registry().is_local());
    assert!(worker.wait_for_start().await);
    worker.report_status(ProcessState::Running).await.unwrap();

    let first = Arc::new(Barrier::new(worker.registry().clone(), "threads").await.unwrap());
    let second = Barrier::new(worker.registry().clone(), "threads").await.unwrap();

    let waiting = {
        let first = Arc::clone(&first);
        tokio::spawn(async move { first.wait().await })
    };
    eventually("first waiter", || worker.registry().snapshot("threads") == Some((2, 1))).await;
    assert!(!waiting.is_finished());

    assert_eq!(prompt("second wait", second.wait()).await.unwrap(), WaitOutcome::Opened);
    assert_eq!(prompt("first wait", waiting).await.unwrap().unwrap(), WaitOutcome::Opened);

    worker.shutdown().await;
    agent.shutdown().await;
}

#[tokio::test]
async fn unreachable_console_falls_back_to_local() {
    let cluster = Cluster::start(1, false).await;
    let agent = &cluster.agents[0];
    // Console address that nobody listens on
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let worker = connect_worker(agent, port, WorkerIdentity::new("e2e", 0, 0)).await;
    assert!(worker.registry().is_local());

    let barrier = Barrier::new(worker.registry().clone(), "solo").await.unwrap();
    assert_eq!(prompt("solo wait", barrier.wait()).await.unwrap(), WaitOutcome::Opened);
    assert_eq!(cluster.console.coordinator().snapshot("solo"), None);

    worker.shutdown().await;
    cluster.shutdown().await;
}
