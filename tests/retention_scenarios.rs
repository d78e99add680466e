//! End-to-end retention runs against the SQLite round store.
#![cfg(feature = "sqlite-db")]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use roundkeeper::storage::SqliteRoundStore;
use roundkeeper::{Cadence, Completion, Exit, RetentionConfig, RetentionManager, RetentionStore, StoreError};

fn populated(n: u64) -> Arc<SqliteRoundStore> {
    let store = SqliteRoundStore::open_in_memory().unwrap();
    if n > 0 {
        store.insert_rounds(1..=n).unwrap();
    }
    Arc::new(store)
}

async fn run_with(
    store: Arc<dyn RetentionStore>,
    cfg: RetentionConfig,
    rounds: &[u64],
) -> Completion {
    let parent = CancellationToken::new();
    let manager = RetentionManager::new(&parent, cfg, store);
    let (tx, rx) = mpsc::channel(rounds.len().max(1));
    for round in rounds {
        tx.send(*round).await.unwrap();
    }
    drop(tx);
    manager.spawn(rx).await.unwrap()
}

#[tokio::test]
async fn once_prunes_to_window_and_stops() {
    let store = populated(20);
    let cfg = RetentionConfig::new(10, Cadence::Once, 10);

    let done = run_with(store.clone(), cfg, &[20, 25]).await;

    assert_eq!(done, Completion { exit: Exit::OnceCompleted, notifications: 1 });
    assert_eq!(store.row_count().unwrap(), 10);
    assert_eq!(store.rounds().unwrap(), (11..=20).collect::<Vec<_>>());
}

#[tokio::test]
async fn window_larger_than_history_keeps_everything() {
    let store = populated(3);
    let cfg = RetentionConfig::new(5, Cadence::Periodic(1), 0);

    let done = run_with(store.clone(), cfg, &[3]).await;

    assert_eq!(done.exit, Exit::ChannelClosed);
    assert_eq!(store.row_count().unwrap(), 3);
}

#[tokio::test]
async fn window_equal_to_history_keeps_everything() {
    let store = populated(3);
    let cfg = RetentionConfig::new(3, Cadence::Once, 0);

    let done = run_with(store.clone(), cfg, &[3]).await;

    assert_eq!(done.exit, Exit::ChannelClosed);
    assert_eq!(store.row_count().unwrap(), 3);
}

#[tokio::test]
async fn periodic_recomputes_cutoff_each_round() {
    let store = populated(20);
    let parent = CancellationToken::new();
    let cfg = RetentionConfig::new(15, Cadence::Periodic(1), 5);
    let mut manager = RetentionManager::new(&parent, cfg, store.clone());

    assert_eq!(manager.on_round(20).await, None);
    assert_eq!(store.row_count().unwrap(), 15);
    assert_eq!(store.round_bounds().unwrap(), Some((6, 20)));

    // cutoff 7: round 6 goes
    assert_eq!(manager.on_round(21).await, None);
    assert_eq!(store.row_count().unwrap(), 14);
    assert_eq!(store.round_bounds().unwrap(), Some((7, 20)));
    assert_eq!(manager.notifications(), 2);
}

#[tokio::test]
async fn restarted_manager_prunes_further() {
    let store = populated(20);

    let first = RetentionConfig::new(15, Cadence::Periodic(100), 5);
    let parent = CancellationToken::new();
    let manager = RetentionManager::new(&parent, first, store.clone());
    let (tx, rx) = mpsc::channel(1);
    let handle = manager.spawn(rx);
    tx.send(20).await.unwrap();
    // give the startup cleanup a moment, then shut the scope
    while store.row_count().unwrap() != 15 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    parent.cancel();
    assert_eq!(handle.await.unwrap().exit, Exit::Cancelled);

    let second = RetentionConfig::new(10, Cadence::Periodic(100), 5);
    let done = run_with(store.clone(), second, &[20]).await;
    assert_eq!(done.exit, Exit::ChannelClosed);
    assert_eq!(store.row_count().unwrap(), 10);
}

struct SlowStore {
    calls: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl RetentionStore for SlowStore {
    async fn delete_older_than(&self, _cutoff: u64, timeout: Duration) -> Result<u64, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::timeout(timeout, tokio::time::sleep(self.delay))
            .await
            .map_err(|_| StoreError::Timeout(timeout))?;
        Ok(0)
    }
}

#[tokio::test]
async fn store_timeout_terminates_manager() {
    let store = Arc::new(SlowStore { calls: AtomicUsize::new(0), delay: Duration::from_secs(30) });
    let cfg = RetentionConfig::new(1, Cadence::Periodic(1), 1);

    let done = run_with(store.clone(), cfg, &[10, 11, 12]).await;

    assert_eq!(done, Completion { exit: Exit::StoreFailed, notifications: 1 });
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellation_while_waiting_makes_no_store_call() {
    let store = Arc::new(SlowStore { calls: AtomicUsize::new(0), delay: Duration::ZERO });
    let parent = CancellationToken::new();
    let manager = RetentionManager::new(&parent, RetentionConfig::new(1, Cadence::Periodic(1), 0), store.clone());
    let (_tx, rx) = mpsc::channel::<u64>(1);

    let handle = manager.spawn(rx);
    parent.cancel();
    let done = tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

    assert_eq!(done, Completion { exit: Exit::Cancelled, notifications: 0 });
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}
