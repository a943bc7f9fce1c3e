// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drover_core::test_support::worker;

fn registry() -> Arc<BarrierGroupRegistry> {
    Arc::new(BarrierGroupRegistry::new(worker(1), None))
}

const SHORT: Duration = Duration::from_millis(20);

#[tokio::test]
async fn handle_holds_one_barrier() {
    let registry = registry();
    let a = Barrier::new(registry.clone(), "start").await.unwrap();
    let b = Barrier::new(registry.clone(), "start").await.unwrap();
    assert_eq!(a.name(), "start");
    assert_eq!(registry.snapshot("start"), Some((2, 0)));

    a.close().await.unwrap();
    a.close().await.unwrap();
    assert_eq!(registry.snapshot("start"), Some((1, 0)));

    b.close().await.unwrap();
    assert_eq!(registry.snapshot("start"), None);
}

#[tokio::test]
async fn all_handles_released_together() {
    let registry = registry();
    let a = Arc::new(Barrier::new(registry.clone(), "start").await.unwrap());
    let b = Barrier::new(registry.clone(), "start").await.unwrap();

    let first = {
        let a = Arc::clone(&a);
        tokio::spawn(async move { a.wait().await })
    };
    tokio::time::sleep(SHORT).await;
    assert!(!first.is_finished());

    assert_eq!(b.wait().await.unwrap(), WaitOutcome::Opened);
    assert_eq!(first.await.unwrap().unwrap(), WaitOutcome::Opened);
}

#[tokio::test]
async fn second_wait_on_same_handle_is_rejected() {
    let registry = registry();
    let a = Arc::new(Barrier::new(registry.clone(), "start").await.unwrap());
    let _other = Barrier::new(registry.clone(), "start").await.unwrap();

    let waiting = {
        let a = Arc::clone(&a);
        tokio::spawn(async move { a.wait().await })
    };
    tokio::time::sleep(SHORT).await;

    assert!(matches!(a.wait().await, Err(BarrierError::AlreadyWaiting { .. })));
    assert!(a.cancel().await.unwrap());
    assert_eq!(waiting.await.unwrap().unwrap(), WaitOutcome::Cancelled);
}

#[tokio::test]
async fn cancel_without_wait_is_false() {
    let registry = registry();
    let a = Barrier::new(registry, "start").await.unwrap();
    assert!(!a.cancel().await.unwrap());
}

#[tokio::test]
async fn timeout_cancels_the_wait() {
    let registry = registry();
    let a = Barrier::new(registry.clone(), "start").await.unwrap();
    let _absent = Barrier::new(registry.clone(), "start").await.unwrap();

    assert!(!a.wait_timeout(SHORT).await.unwrap());
    assert_eq!(registry.snapshot("start"), Some((2, 0)));

    // The handle is usable again.
    assert!(!a.wait_timeout(SHORT).await.unwrap());
}

#[tokio::test]
async fn timeout_reports_open() {
    let registry = registry();
    let a = Arc::new(Barrier::new(registry.clone(), "start").await.unwrap());
    let b = Barrier::new(registry.clone(), "start").await.unwrap();

    let waiting = {
        let a = Arc::clone(&a);
        tokio::spawn(async move { a.wait_timeout(Duration::from_secs(5)).await })
    };
    tokio::time::sleep(SHORT).await;
    assert_eq!(b.wait().await.unwrap(), WaitOutcome::Opened);
    assert!(waiting.await.unwrap().unwrap());
}

#[tokio::test]
async fn close_cancels_outstanding_wait() {
    let registry = registry();
    let a = Arc::new(Barrier::new(registry.clone(), "start").await.unwrap());
    let _other = Barrier::new(registry.clone(), "start").await.unwrap();

    let waiting = {
        let a = Arc::clone(&a);
        tokio::spawn(async move { a.wait().await })
    };
    tokio::time::sleep(SHORT).await;

    a.close().await.unwrap();
    assert_eq!(waiting.await.unwrap().unwrap(), WaitOutcome::Cancelled);
    assert!(matches!(a.wait().await, Err(BarrierError::Closed)));
    assert_eq!(registry.snapshot("start"), Some((1, 0)));
}
