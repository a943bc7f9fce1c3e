// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control messages flow console client → console → agents → workers.

use crate::prelude::*;

fn console_client(cluster: &Cluster) -> Connector {
    Connector::new("127.0.0.1", cluster.console_port(), ConnectionType::ConsoleClient)
}

#[tokio::test]
async fn stop_from_console_client_reaches_every_worker() {
    let cluster = Cluster::start(2, true).await;
    let workers = vec![cluster.worker(0, 0).await, cluster.worker(1, 0).await];
    cluster.workers_joined(1).await;

    send_control(&console_client(&cluster), &Message::Stop).await.unwrap();

    for worker in &workers {
        assert!(!prompt("process:stop", worker.wait_for_start()).await);
        assert!(worker.stop_requested());
    }

    for worker in &workers {
        worker.shutdown().await;
    }
    cluster.shutdown().await;
}

#[tokio::test]
async fn reset_is_observable() {
    let cluster = Cluster::start(1, false).await;
    let worker = cluster.worker(0, 0).await;
    cluster.workers_joined(1).await;

    send_control(&console_client(&cluster), &Message::Reset).await.unwrap();
    eventually("reset", || worker.reset_requested()).await;

    worker.shutdown().await;
    cluster.shutdown().await;
}

#[tokio::test]
async fn console_shutdown_closes_agents() {
    let cluster = Cluster::start(1, false).await;
    cluster.console.shutdown().await;
    prompt("relay to end", cluster.agents[0].console_closed()).await;
    cluster.agents[0].shutdown().await;
}
