use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::retention::manager::Completion;

/// Holds running tasks and the parent cancellation scope for the node.
/// Call `shutdown()` to gracefully stop services.
pub struct ServiceHandle {
    shutdown: CancellationToken,
    join_handles: Vec<(&'static str, JoinHandle<Completion>)>,
}

impl Default for ServiceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceHandle {
    pub fn new() -> Self {
        Self { shutdown: CancellationToken::new(), join_handles: vec![] }
    }

    /// Parent scope; services derive child tokens from it.
    pub fn token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Attach a background task handle (so we wait on it on shutdown).
    pub fn attach(&mut self, name: &'static str, h: JoinHandle<Completion>) {
        self.join_handles.push((name, h));
    }

    /// Signal shutdown to all tasks and await them sequentially.
    pub async fn shutdown(self) -> Vec<(&'static str, Completion)> {
        self.shutdown.cancel();
        self.join().await
    }

    /// Await all tasks without signalling shutdown.
    pub async fn join(self) -> Vec<(&'static str, Completion)> {
        let mut done = Vec::with_capacity(self.join_handles.len());
        for (name, h) in self.join_handles {
            match h.await {
                Ok(completion) => {
                    info!(service = name, exit = ?completion.exit, "service stopped");
                    done.push((name, completion));
                }
                Err(e) => error!(service = name, "task join error: {:?}", e),
            }
        }
        done
    }
}
