//! Configuration: the retention policy block and the node config file that wraps it.
//!
//! ```toml
//! [store]
//! path = "./data/rounds.db"
//!
//! [retention]
//! rounds = 100000   # window: most recent rounds kept
//! interval = 10     # -1 once, 0 disabled, n > 0 every n notifications
//! timeout = 5       # seconds per delete, 0 means default
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::retention::policy::Cadence;
use crate::utils::{Result, RoundkeeperError};

/// Used when `timeout` is zero or left out.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Retention policy settings. Immutable for the lifetime of one manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Number of most recent rounds that must stay in the store.
    pub rounds: u64,
    pub interval: Cadence,
    /// Per-delete bound in seconds.
    pub timeout: u64,
}

impl RetentionConfig {
    pub fn new(rounds: u64, interval: Cadence, timeout: u64) -> Self {
        Self { rounds, interval, timeout }
    }

    /// Effective per-delete timeout.
    pub fn timeout(&self) -> Duration {
        let secs = if self.timeout > 0 { self.timeout } else { DEFAULT_TIMEOUT_SECS };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file, or `:memory:`.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: "./data/rounds.db".into() }
    }
}

/// Top-level config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub store: StoreConfig,
    pub retention: RetentionConfig,
}

impl NodeConfig {
    /// Load config from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            RoundkeeperError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self> {
        let cfg: NodeConfig = toml::from_str(data)?;
        if cfg.store.path.trim().is_empty() {
            return Err(RoundkeeperError::Config("store.path must not be empty".into()));
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_timeout_defaults_when_zero() {
        assert_eq!(RetentionConfig::default().timeout(), Duration::from_secs(5));
        let cfg = RetentionConfig::new(10, Cadence::Once, 12);
        assert_eq!(cfg.timeout(), Duration::from_secs(12));
    }

    #[test]
    fn test_parse_full_file() {
        let cfg = NodeConfig::parse(
            r#"
            [store]
            path = ":memory:"

            [retention]
            rounds = 10
            interval = -1
            timeout = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.store.path, ":memory:");
        assert_eq!(cfg.retention, RetentionConfig::new(10, Cadence::Once, 10));
    }

    #[test]
    fn test_parse_keeps_invalid_interval() {
        // rejected lazily by the policy, not at load time
        let cfg = NodeConfig::parse("[retention]\nrounds = 1\ninterval = -7\n").unwrap();
        assert_eq!(cfg.retention.interval, Cadence::Invalid(-7));
        assert_eq!(cfg.retention.timeout, 0);
    }

    #[test]
    fn test_parse_defaults_to_disabled() {
        let cfg = NodeConfig::parse("").unwrap();
        assert_eq!(cfg.retention.interval, Cadence::Disabled);
        assert_eq!(cfg.store, StoreConfig::default());
    }

    #[test]
    fn test_empty_store_path_rejected() {
        let err = NodeConfig::parse("[store]\npath = \"\"\n").unwrap_err();
        assert!(matches!(err, RoundkeeperError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[retention]\nrounds = 15\ninterval = 1").unwrap();
        let cfg = NodeConfig::load(f.path()).unwrap();
        assert_eq!(cfg.retention.rounds, 15);
        assert_eq!(cfg.retention.interval, Cadence::Periodic(1));

        let missing = NodeConfig::load("/nonexistent/roundkeeper.toml");
        assert!(matches!(missing, Err(RoundkeeperError::Config(_))));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let cfg = NodeConfig {
            store: StoreConfig { path: "rounds.db".into() },
            retention: RetentionConfig::new(3, Cadence::Periodic(4), 0),
        };
        let text = toml::to_string(&cfg).unwrap();
        assert_eq!(NodeConfig::parse(&text).unwrap(), cfg);
    }
}
