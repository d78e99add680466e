use std::collections::HashMap;
use std::sync::Arc;
use lazy_static::lazy_static;
use parking_lot::Mutex;

pub const PRUNE_RUNS: &str = "retention_prune_runs";
pub const PRUNE_FAILURES: &str = "retention_prune_failures";
pub const ROWS_DELETED: &str = "retention_rows_deleted";
pub const CUTOFF_ROUND: &str = "retention_cutoff_round";

/// Metrics registry (simple, Prometheus-style)
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<Mutex<HashMap<String, u64>>>,
    gauges: Arc<Mutex<HashMap<String, f64>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_counter(&self, name: &str) {
        self.add_counter(name, 1);
    }

    pub fn add_counter(&self, name: &str, by: u64) {
        let mut counters = self.counters.lock();
        let slot = counters.entry(name.to_string()).or_insert(0);
        *slot = slot.saturating_add(by);
    }

    pub fn set_gauge(&self, name: &str, val: f64) {
        self.gauges.lock().insert(name.to_string(), val);
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> (HashMap<String, u64>, HashMap<String, f64>) {
        (self.counters.lock().clone(), self.gauges.lock().clone())
    }
}

lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}

/// Record a store call issued by the retention manager that removed `rows`.
pub fn record_prune(cutoff: u64, rows: u64) {
    METRICS.inc_counter(PRUNE_RUNS);
    METRICS.add_counter(ROWS_DELETED, rows);
    METRICS.set_gauge(CUTOFF_ROUND, cutoff as f64);
}

/// Record a store call that failed or timed out.
pub fn record_prune_failure() {
    METRICS.inc_counter(PRUNE_RUNS);
    METRICS.inc_counter(PRUNE_FAILURES);
}
