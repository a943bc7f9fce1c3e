// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A worker that goes away stops counting toward the barriers it joined.

use std::sync::Arc;

use crate::prelude::*;

#[tokio::test]
async fn departed_worker_releases_phase2() {
    let cluster = Cluster::start(1, false).await;
    let (a, b, c) = (cluster.worker(0, 0).await, cluster.worker(0, 1).await, cluster.worker(0, 2).await);
    let barrier_a = Arc::new(Barrier::new(a.registry().clone(), "phase2").await.unwrap());
    let barrier_b = Arc::new(Barrier::new(b.registry().clone(), "phase2").await.unwrap());
    let _barrier_c = Barrier::new(c.registry().clone(), "phase2").await.unwrap();
    cluster.barriers_registered("phase2", 3).await;

    let waits: Vec<_> = [&barrier_a, &barrier_b]
        .into_iter()
        .map(|barrier| {
            let barrier = Arc::clone(barrier);
            tokio::spawn(async move { barrier.wait().await })
        })
        .collect();
    let coordinator = cluster.console.coordinator();
    eventually("two waiters", || coordinator.snapshot("phase2") == Some((3, 2))).await;

    c.shutdown().await;

    for wait in waits {
        assert_eq!(prompt("release", wait).await.unwrap().unwrap(), WaitOutcome::Opened);
    }
    assert_eq!(coordinator.snapshot("phase2"), Some((2, 0)));

    a.shutdown().await;
    b.shutdown().await;
    cluster.shutdown().await;
}

#[tokio::test]
async fn closed_handle_no_longer_counts() {
    let cluster = Cluster::start(1, false).await;
    let (a, b) = (cluster.worker(0, 0).await, cluster.worker(0, 1).await);
    let barrier_a = Barrier::new(a.registry().clone(), "phase3").await.unwrap();
    let barrier_b = Barrier::new(b.registry().clone(), "phase3").await.unwrap();
    cluster.barriers_registered("phase3", 2).await;

    barrier_b.close().await.unwrap();
    cluster.barriers_registered("phase3", 1).await;

    assert_eq!(prompt("sole party", barrier_a.wait()).await.unwrap(), WaitOutcome::Opened);

    a.shutdown().await;
    b.shutdown().await;
    cluster.shutdown().await;
}
