// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workers on several agents meet at a named barrier.

use std::sync::Arc;

use crate::prelude::*;

#[tokio::test]
async fn three_workers_across_two_agents_meet_at_start() {
    let cluster = Cluster::start(2, true).await;
    let workers = vec![cluster.worker(0, 0).await, cluster.worker(0, 1).await, cluster.worker(1, 0).await];
    for worker in &workers {
        assert!(worker.waits_for_start());
        assert!(!worker.registry().is_local());
    }
    eventually("workers to join", || {
        cluster.agents[0].workers() == 2 && cluster.agents[1].workers() == 1
    })
    .await;

    cluster.console.broadcast(&Message::Start).await.unwrap();
    for worker in &workers {
        assert!(prompt("process:start", worker.wait_for_start()).await);
        worker.report_status(ProcessState::Started).await.unwrap();
    }

    let mut barriers = Vec::new();
    for worker in &workers {
        barriers.push(Arc::new(Barrier::new(worker.registry().clone(), "start").await.unwrap()));
    }
    cluster.barriers_registered("start", 3).await;

    let (last, first) = barriers.split_last().unwrap();
    let early: Vec<_> = first
        .iter()
        .map(|barrier| {
            let barrier = Arc::clone(barrier);
            tokio::spawn(async move { barrier.wait().await })
        })
        .collect();
    let coordinator = cluster.console.coordinator();
    eventually("two waiters", || coordinator.snapshot("start") == Some((3, 2))).await;
    for handle in &early {
        assert!(!handle.is_finished(), "released before the last party arrived");
    }

    assert_eq!(prompt("last wait", last.wait()).await.unwrap(), WaitOutcome::Opened);
    for handle in early {
        assert_eq!(prompt("early wait", handle).await.unwrap().unwrap(), WaitOutcome::Opened);
    }
    assert_eq!(coordinator.snapshot("start"), Some((3, 0)));

    for worker in &workers {
        worker.report_status(ProcessState::Finished).await.unwrap();
        worker.shutdown().await;
    }
    cluster.shutdown().await;
}

#[tokio::test]
async fn barrier_is_reusable_across_rounds() {
    let cluster = Cluster::start(1, false).await;
    let workers = vec![cluster.worker(0, 0).await, cluster.worker(0, 1).await];
    let mut barriers = Vec::new();
    for worker in &workers {
        barriers.push(Arc::new(Barrier::new(worker.registry().clone(), "loop").await.unwrap()));
    }
    cluster.barriers_registered("loop", 2).await;

    for _ in 0..3 {
        let handles: Vec<_> = barriers
            .iter()
            .map(|barrier| {
                let barrier = Arc::clone(barrier);
                tokio::spawn(async move { barrier.wait().await })
            })
            .collect();
        for handle in handles {
            assert_eq!(prompt("round", handle).await.unwrap().unwrap(), WaitOutcome::Opened);
        }
    }

    for worker in &workers {
        worker.shutdown().await;
    }
    cluster.shutdown().await;
}

#[tokio::test]
async fn timed_out_wait_does_not_count() {
    let cluster = Cluster::start(1, false).await;
    let (a, b) = (cluster.worker(0, 0).await, cluster.worker(0, 1).await);
    let barrier_a = Barrier::new(a.registry().clone(), "gate").await.unwrap();
    let barrier_b = Barrier::new(b.registry().clone(), "gate").await.unwrap();
    cluster.barriers_registered("gate", 2).await;

    assert!(!barrier_a.wait_timeout(std::time::Duration::from_millis(100)).await.unwrap());
    let coordinator = cluster.console.coordinator();
    eventually("cancel to land", || coordinator.snapshot("gate") == Some((2, 0))).await;

    // b alone must not open the barrier now that a's wait was withdrawn
    assert!(!barrier_b.wait_timeout(std::time::Duration::from_millis(200)).await.unwrap());

    a.shutdown().await;
    b.shutdown().await;
    cluster.shutdown().await;
}
