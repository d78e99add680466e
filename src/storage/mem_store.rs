//! In-memory round store (BTreeMap of round -> row count) for tests/dev.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use crate::retention::store::{RetentionStore, StoreError};

#[derive(Clone, Default)]
pub struct InMemRoundStore {
    inner: Arc<RwLock<BTreeMap<u64, u64>>>,
}

impl InMemRoundStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `rows` rows for `round`.
    pub fn insert(&self, round: u64, rows: u64) {
        *self.inner.write().entry(round).or_insert(0) += rows;
    }

    pub fn insert_rounds(&self, rounds: RangeInclusive<u64>) -> usize {
        let mut map = self.inner.write();
        let mut n = 0;
        for round in rounds {
            *map.entry(round).or_insert(0) += 1;
            n += 1;
        }
        n
    }

    pub fn row_count(&self) -> u64 {
        self.inner.read().values().sum()
    }

    pub fn rounds(&self) -> Vec<u64> {
        self.inner.read().keys().copied().collect()
    }

    pub fn round_bounds(&self) -> Option<(u64, u64)> {
        let map = self.inner.read();
        let lo = map.keys().next()?;
        let hi = map.keys().next_back()?;
        Some((*lo, *hi))
    }
}

#[async_trait]
impl RetentionStore for InMemRoundStore {
    async fn delete_older_than(&self, cutoff: u64, _timeout: Duration) -> Result<u64, StoreError> {
        let mut map = self.inner.write();
        let kept = map.split_off(&cutoff);
        let removed = std::mem::replace(&mut *map, kept);
        Ok(removed.values().sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inmem_delete_and_idempotence() {
        let store = InMemRoundStore::new();
        store.insert_rounds(1..=20);
        store.insert(20, 2);
        assert_eq!(store.row_count(), 22);

        assert_eq!(store.delete_older_than(6, Duration::from_secs(1)).await.unwrap(), 5);
        assert_eq!(store.delete_older_than(6, Duration::from_secs(1)).await.unwrap(), 0);
        assert_eq!(store.delete_older_than(2, Duration::from_secs(1)).await.unwrap(), 0);
        assert_eq!(store.round_bounds(), Some((6, 20)));
        assert_eq!(store.row_count(), 17);
    }

    #[test]
    fn test_inmem_delete_outside_runtime() {
        let store = InMemRoundStore::new();
        store.insert_rounds(1..=3);
        let removed = tokio_test::block_on(store.delete_older_than(4, Duration::from_secs(1)));
        assert_eq!(tokio_test::assert_ok!(removed), 3);
        assert_eq!(store.row_count(), 0);
    }

    #[test]
    fn test_inmem_empty_bounds() {
        assert_eq!(InMemRoundStore::new().round_bounds(), None);
        assert!(InMemRoundStore::new().rounds().is_empty());
    }
}
