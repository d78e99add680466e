//! Node orchestration: open the round store, spawn the retention manager, and
//! hand the caller a sender for processed rounds.

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::NodeConfig;
use crate::node::service_handle::ServiceHandle;
use crate::retention::manager::{Completion, RetentionManager};
use crate::storage::{self, RoundStore, StorageEngine};

/// Rounds buffered between the pipeline and the manager.
pub const ROUND_CHANNEL_CAPACITY: usize = 64;

const RETENTION_SERVICE: &str = "retention";

/// Main Node object
pub struct Node {
    cfg: NodeConfig,
}

impl Node {
    pub fn new(cfg: NodeConfig) -> Self {
        Self { cfg }
    }

    pub fn open_store(&self) -> Result<RoundStore> {
        let engine = StorageEngine::from_path(&self.cfg.store.path);
        Ok(storage::open(&engine)?)
    }

    /// Start the node against a freshly opened store.
    pub async fn start(self) -> Result<RunningNode> {
        let store = self.open_store()?;
        Ok(self.start_with_store(store))
    }

    /// Start the node against an already opened store.
    pub fn start_with_store(self, store: RoundStore) -> RunningNode {
        let mut services = ServiceHandle::new();
        let (rounds, rx) = mpsc::channel(ROUND_CHANNEL_CAPACITY);

        let manager = RetentionManager::new(services.token(), self.cfg.retention.clone(), store.retention());
        services.attach(RETENTION_SERVICE, manager.spawn(rx));

        info!(store = store.name(), path = %self.cfg.store.path, "node started");
        RunningNode { store, rounds, services }
    }
}

pub struct RunningNode {
    pub store: RoundStore,
    rounds: mpsc::Sender<u64>,
    services: ServiceHandle,
}

impl RunningNode {
    /// Forward a processed round to the retention manager. Returns `false`
    /// once the manager has stopped listening.
    pub async fn notify(&self, round: u64) -> bool {
        match self.rounds.send(round).await {
            Ok(()) => true,
            Err(_) => {
                debug!(round, "retention manager no longer listening");
                false
            }
        }
    }

    pub fn round_sender(&self) -> mpsc::Sender<u64> {
        self.rounds.clone()
    }

    /// Cancel all services and wait for them. The round sender stays open
    /// until the services are joined so the manager exits on cancellation.
    pub async fn shutdown(self) -> Option<Completion> {
        let RunningNode { rounds, services, .. } = self;
        let done = services.shutdown().await;
        drop(rounds);
        Self::retention_completion(done)
    }

    /// Stop feeding rounds and wait for the manager to drain what it has.
    pub async fn finish(self) -> Option<Completion> {
        let RunningNode { rounds, services, .. } = self;
        drop(rounds);
        Self::retention_completion(services.join().await)
    }

    fn retention_completion(done: Vec<(&'static str, Completion)>) -> Option<Completion> {
        done.into_iter()
            .find(|(name, _)| *name == RETENTION_SERVICE)
            .map(|(_, c)| c)
    }
}
