//! Retention manager: a single background task that turns round notifications
//! into bounded deletes.
//!
//! The task waits on two things only: the next round from the pipeline and the
//! cancellation of its scope. Every terminal condition (once-cleanup done,
//! retention disabled, bad cadence, store failure) ends the loop for good.
//! Nothing is retried here; a fresh manager resumes pruning.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RetentionConfig;
use crate::retention::policy::{decide, Decision};
use crate::retention::store::{RetentionStore, StoreError};
use crate::utils::metrics;

/// Why the manager loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The owning scope was cancelled.
    Cancelled,
    /// Every round sender was dropped.
    ChannelClosed,
    /// The single `Once` cleanup ran.
    OnceCompleted,
    /// Cadence is `Disabled`.
    Disabled,
    /// Cadence is below `Once`.
    InvalidCadence,
    /// A delete failed or timed out.
    StoreFailed,
}

/// Completion signal handed back to the owner exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub exit: Exit,
    /// Round notifications received before the loop stopped.
    pub notifications: u64,
}

pub struct RetentionManager {
    config: RetentionConfig,
    store: Arc<dyn RetentionStore>,
    cancel: CancellationToken,
    notifications: u64,
    terminated: Option<Exit>,
}

impl RetentionManager {
    /// Create a manager whose scope is a child of `parent`: cancelling the
    /// parent stops the manager, the manager stopping leaves the parent alone.
    pub fn new(parent: &CancellationToken, config: RetentionConfig, store: Arc<dyn RetentionStore>) -> Self {
        Self {
            config,
            store,
            cancel: parent.child_token(),
            notifications: 0,
            terminated: None,
        }
    }

    /// Token for this manager's own scope.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn notifications(&self) -> u64 {
        self.notifications
    }

    /// Terminal state, if the manager has reached one.
    pub fn terminated(&self) -> Option<Exit> {
        self.terminated
    }

    /// Start the loop on the tokio runtime. The handle resolves once, when the
    /// loop exits.
    pub fn spawn(self, rounds: mpsc::Receiver<u64>) -> JoinHandle<Completion> {
        tokio::spawn(self.run(rounds))
    }

    /// Run the loop until cancellation, channel close or a terminal decision.
    pub async fn run(mut self, mut rounds: mpsc::Receiver<u64>) -> Completion {
        // releases this manager's scope on every exit path
        let _scope = self.cancel.clone().drop_guard();

        info!(
            rounds = self.config.rounds,
            interval = %self.config.interval,
            timeout_secs = self.config.timeout().as_secs(),
            "retention manager started"
        );

        let exit = loop {
            let round = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("retention manager cancelled");
                    break Exit::Cancelled;
                }
                next = rounds.recv() => match next {
                    Some(round) => round,
                    None => {
                        info!("round channel closed, retention manager stopping");
                        break Exit::ChannelClosed;
                    }
                },
            };

            if let Some(exit) = self.on_round(round).await {
                break exit;
            }
        };

        info!(?exit, notifications = self.notifications, "retention manager exited");
        Completion { exit, notifications: self.notifications }
    }

    /// Handle one notification. Returns `Some` when the manager must stop.
    /// The counter moves by exactly one whatever the outcome. Once terminal,
    /// further rounds are ignored and the store is never called again.
    pub async fn on_round(&mut self, round: u64) -> Option<Exit> {
        if let Some(exit) = self.terminated {
            debug!(round, ?exit, "retention manager terminated, ignoring round");
            return Some(exit);
        }

        debug!(round, counter = self.notifications, "received round");
        let decision = decide(&self.config, self.notifications, round);
        let first = self.notifications == 0;
        let outcome = self.apply(decision, first).await;
        self.notifications += 1;
        self.terminated = outcome;
        outcome
    }

    async fn apply(&self, decision: Decision, first: bool) -> Option<Exit> {
        match decision {
            Decision::Skip => None,
            Decision::DeleteAndContinue(cutoff) => match self.prune(cutoff).await {
                Ok(rows) if first => {
                    info!(cutoff, rows, "startup data pruning complete");
                    None
                }
                Ok(rows) => {
                    info!(cutoff, rows, "periodic data pruning complete");
                    None
                }
                Err(_) => Some(Exit::StoreFailed),
            },
            Decision::DeleteAndStop(cutoff) => match self.prune(cutoff).await {
                Ok(rows) => {
                    info!(cutoff, rows, "one-time data pruning complete");
                    Some(Exit::OnceCompleted)
                }
                Err(_) => Some(Exit::StoreFailed),
            },
            Decision::Stop => {
                info!(interval = %self.config.interval, "data pruning is disabled");
                Some(Exit::Disabled)
            }
            Decision::Fatal => {
                error!(interval = %self.config.interval, "invalid interval value, data pruning stopped");
                Some(Exit::InvalidCadence)
            }
        }
    }

    async fn prune(&self, cutoff: u64) -> Result<u64, StoreError> {
        let timeout = self.config.timeout();
        match self.store.delete_older_than(cutoff, timeout).await {
            Ok(rows) => {
                metrics::record_prune(cutoff, rows);
                Ok(rows)
            }
            Err(e) => {
                metrics::record_prune_failure();
                warn!(cutoff, timeout = e.is_timeout(), error = %e, "data pruning failed");
                Err(e)
            }
        }
    }
}
