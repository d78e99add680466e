use thiserror::Error;

use crate::retention::store::StoreError;

/// Unified error type for roundkeeper
#[derive(Error, Debug)]
pub enum RoundkeeperError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "sqlite-db")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, RoundkeeperError>;
