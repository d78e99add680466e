use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a retention store. `Timeout` is kept apart from
/// backend failures so callers can tell a slow store from a broken one.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("delete timed out after {0:?}")]
    Timeout(Duration),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("store task failed: {0}")]
    Join(String),
}

impl StoreError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }
}

#[cfg(feature = "sqlite-db")]
impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Join(e.to_string())
    }
}

/// The one capability the retention manager needs from the persistent store.
///
/// Implementations must be idempotent: calling again with the same or a
/// smaller cutoff is not an error and removes nothing that is still retained.
#[async_trait]
pub trait RetentionStore: Send + Sync + 'static {
    /// Delete every row belonging to a round strictly below `cutoff`,
    /// bounded by `timeout`. Returns the number of rows removed.
    async fn delete_older_than(&self, cutoff: u64, timeout: Duration) -> Result<u64, StoreError>;
}
