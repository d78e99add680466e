//! Retention module: keeps a sliding window of recent rounds in the store.
//!
//! Public surface:
//! - policy: `Cadence`, `Decision`, `decide`
//! - store: the `RetentionStore` port and `StoreError`
//! - manager: `RetentionManager`, the background task driving deletes

pub mod policy;
pub mod store;
pub mod manager;

pub use policy::{decide, Cadence, Decision};
pub use store::{RetentionStore, StoreError};
pub use manager::{Completion, Exit, RetentionManager};
