//! Timer behaviour of the sync scheduler, on a paused tokio clock.

mod support;

use docveil_sync::{MemoryBlobStore, SyncConfig, SyncEngine, SyncError, SyncScheduler};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use std::sync::atomic::Ordering;
use support::{FailingWrites, bob, client, open_existing, open_new};
use tokio::time::sleep;

fn quiet_polls() -> SyncConfig {
    SyncConfig {
        poll_interval_ms: 3_600_000,
        ..SyncConfig::default()
    }
}

// ── Debounced push ──

#[tokio::test(start_paused = true)]
async fn burst_of_edits_is_pushed_once() {
    let store = Arc::new(MemoryBlobStore::new());
    let session = open_new(store.clone()).await;
    let baseline = store.update_count();
    let engine = Arc::new(SyncEngine::new(session.clone(), client(store.clone())));
    let handle = SyncScheduler::start(engine, &quiet_polls());

    for i in 0..5 {
        session.record_insert(i, "x");
        handle.notify_edit();
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(store.update_count(), baseline);

    sleep(Duration::from_millis(600)).await;
    assert_eq!(store.update_count(), baseline + 1);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(store.update_count(), baseline + 1);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn sync_now_skips_the_debounce() {
    let store = Arc::new(MemoryBlobStore::new());
    let session = open_new(store.clone()).await;
    let baseline = store.update_count();
    let engine = Arc::new(SyncEngine::new(session.clone(), client(store.clone())));
    let handle = SyncScheduler::start(engine, &quiet_polls());

    session.record_insert(0, "now");
    handle.sync_now().await.unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(store.update_count(), baseline + 1);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_push_is_retried() {
    let store = Arc::new(MemoryBlobStore::new());
    let session = open_new(store.clone()).await;
    let baseline = store.update_count();
    let engine = Arc::new(SyncEngine::new(session.clone(), client(store.clone())));
    let handle = SyncScheduler::start(engine, &SyncConfig::default());

    store.set_offline(true).await;
    session.record_insert(0, "retry me");
    handle.notify_edit();
    sleep(Duration::from_millis(700)).await;
    assert_eq!(store.update_count(), baseline);

    store.set_offline(false).await;
    sleep(Duration::from_millis(2_600)).await;
    assert_eq!(store.update_count(), baseline + 1);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn sync_now_keeps_unsent_edits_when_push_fails() {
    let store = Arc::new(FailingWrites::default());
    let session = open_new(store.clone()).await;
    session.add_member("bob", &bob().public).unwrap();
    let engine = Arc::new(SyncEngine::new(session.clone(), client(store.clone())));
    engine.push().await.unwrap();

    let bobs = Arc::new(
        open_existing(store.clone(), bob(), "bob", session.remote_id())
            .await
            .unwrap(),
    );
    bobs.record_insert(0, "remote");
    SyncEngine::new(bobs, client(store.clone()))
        .push()
        .await
        .unwrap();

    store.fail_updates.store(true, Ordering::SeqCst);
    let handle = SyncScheduler::start(engine, &quiet_polls());
    session.record_insert(0, "UNSENT ");
    handle.notify_edit();
    handle.sync_now().await.unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(session.text(), "UNSENT ");

    store.fail_updates.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(2_600)).await;
    assert_eq!(session.text(), "UNSENT ");
    assert_eq!(
        open_existing(store.clone(), bob(), "bob", session.remote_id())
            .await
            .unwrap()
            .text(),
        "UNSENT "
    );
    handle.stop().await;
}

// ── Periodic pull ──

#[tokio::test(start_paused = true)]
async fn poll_picks_up_remote_edits() {
    let store = Arc::new(MemoryBlobStore::new());
    let session = open_new(store.clone()).await;
    session.add_member("bob", &bob().public).unwrap();
    let engine = Arc::new(SyncEngine::new(session.clone(), client(store.clone())));
    engine.push().await.unwrap();
    let handle = SyncScheduler::start(engine, &SyncConfig::default());

    let bobs = Arc::new(
        open_existing(store.clone(), bob(), "bob", session.remote_id())
            .await
            .unwrap(),
    );
    bobs.record_insert(0, "hello from bob");
    SyncEngine::new(bobs, client(store.clone()))
        .push()
        .await
        .unwrap();

    sleep(Duration::from_millis(2_600)).await;
    assert_eq!(session.text(), "hello from bob");
    handle.stop().await;
}

// ── Teardown ──

#[tokio::test(start_paused = true)]
async fn stop_suppresses_further_work() {
    let store = Arc::new(MemoryBlobStore::new());
    let session = open_new(store.clone()).await;
    let baseline_updates = store.update_count();
    let engine = Arc::new(SyncEngine::new(session.clone(), client(store.clone())));
    let handle = SyncScheduler::start(engine.clone(), &SyncConfig::default());

    handle.stop().await;
    let baseline_reads = store.read_count();

    session.record_insert(0, "after stop");
    sleep(Duration::from_secs(30)).await;

    assert_eq!(store.update_count(), baseline_updates);
    assert_eq!(store.read_count(), baseline_reads);
    assert!(engine.is_torn_down());
    assert!(matches!(engine.push().await, Err(SyncError::SessionClosed)));
}
