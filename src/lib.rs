//! Roundkeeper: keeps a bounded window of recent ledger rounds in a relational
//! store and prunes everything older as the pipeline reports processed rounds.
//!
//! - retention: policy, store port, and the background manager
//! - storage: SQLite and in-memory round stores
//! - node: process wiring, shutdown handling, CLI
//! - config, utils: configuration file, errors, logging, metrics

pub mod config;
pub mod node;
pub mod retention;
pub mod storage;
pub mod utils;

pub use config::{NodeConfig, RetentionConfig};
pub use retention::{Cadence, Completion, Decision, Exit, RetentionManager, RetentionStore, StoreError};
