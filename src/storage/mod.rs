//! Storage module: round-keyed backends the retention manager prunes.
//!
//! Engines: SQLite (feature "sqlite-db", the default), in-memory fallback.
//! Use `storage::open(engine)` to get a `RoundStore` handle; hand
//! `RoundStore::retention()` to the manager.

#[cfg(feature = "sqlite-db")]
pub mod sqlite_store;
pub mod mem_store;

#[cfg(feature = "sqlite-db")]
pub use sqlite_store::SqliteRoundStore;
pub use mem_store::InMemRoundStore;

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;

use crate::retention::store::RetentionStore;
use crate::utils::Result;

/// Engine selection enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEngine {
    #[cfg(feature = "sqlite-db")]
    Sqlite(PathBuf),
    Memory,
}

impl StorageEngine {
    /// Pick the engine for a configured store path. `:memory:` stays on SQLite
    /// when it is compiled in.
    pub fn from_path(path: &str) -> Self {
        #[cfg(feature = "sqlite-db")]
        {
            StorageEngine::Sqlite(PathBuf::from(path))
        }
        #[cfg(not(feature = "sqlite-db"))]
        {
            tracing::warn!(path, "sqlite-db feature disabled, using in-memory store");
            StorageEngine::Memory
        }
    }
}

/// An opened backend.
#[derive(Clone)]
pub enum RoundStore {
    #[cfg(feature = "sqlite-db")]
    Sqlite(Arc<SqliteRoundStore>),
    Memory(Arc<InMemRoundStore>),
}

impl RoundStore {
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite-db")]
            RoundStore::Sqlite(_) => "sqlite",
            RoundStore::Memory(_) => "memory",
        }
    }

    /// The port handed to `RetentionManager`.
    pub fn retention(&self) -> Arc<dyn RetentionStore> {
        match self {
            #[cfg(feature = "sqlite-db")]
            RoundStore::Sqlite(s) => s.clone(),
            RoundStore::Memory(s) => s.clone(),
        }
    }

    pub fn insert_rounds(&self, rounds: RangeInclusive<u64>) -> Result<usize> {
        match self {
            #[cfg(feature = "sqlite-db")]
            RoundStore::Sqlite(s) => s.insert_rounds(rounds),
            RoundStore::Memory(s) => Ok(s.insert_rounds(rounds)),
        }
    }

    pub fn row_count(&self) -> Result<u64> {
        match self {
            #[cfg(feature = "sqlite-db")]
            RoundStore::Sqlite(s) => s.row_count(),
            RoundStore::Memory(s) => Ok(s.row_count()),
        }
    }

    pub fn round_bounds(&self) -> Result<Option<(u64, u64)>> {
        match self {
            #[cfg(feature = "sqlite-db")]
            RoundStore::Sqlite(s) => s.round_bounds(),
            RoundStore::Memory(s) => Ok(s.round_bounds()),
        }
    }
}

/// Open a round store for the selected engine.
pub fn open(engine: &StorageEngine) -> Result<RoundStore> {
    match engine {
        #[cfg(feature = "sqlite-db")]
        StorageEngine::Sqlite(path) => {
            let s = SqliteRoundStore::open(path)?;
            Ok(RoundStore::Sqlite(Arc::new(s)))
        }
        StorageEngine::Memory => Ok(RoundStore::Memory(Arc::new(InMemRoundStore::new()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_open_memory_engine() {
        let store = open(&StorageEngine::Memory).unwrap();
        assert_eq!(store.name(), "memory");
        store.insert_rounds(1..=5).unwrap();

        let removed = store.retention().delete_older_than(3, Duration::from_secs(1)).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.row_count().unwrap(), 3);
        assert_eq!(store.round_bounds().unwrap(), Some((3, 5)));
    }

    #[cfg(feature = "sqlite-db")]
    #[tokio::test]
    async fn test_open_sqlite_in_memory() {
        let store = open(&StorageEngine::from_path(":memory:")).unwrap();
        assert_eq!(store.name(), "sqlite");
        store.insert_rounds(1..=3).unwrap();
        assert_eq!(store.row_count().unwrap(), 3);
    }
}
