use crate::resolver::TransitionOrder;
use serde::{Deserialize, Serialize};

/// History entries kept per session unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

/// Runtime options of a `Runner`, independent of the script it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub order: TransitionOrder,
    /// Seeds response selection per `(seed, session, turn)` so that runs are
    /// reproducible. A thread-local generator is used when unset.
    pub seed: Option<u64>,
    /// Keeps only the most recent labels in a session's history, and so in
    /// its snapshots. `None` keeps every label; the history then grows by
    /// one entry per turn for the lifetime of the session.
    pub history_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order: TransitionOrder::default(),
            seed: None,
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, order: TransitionOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn without_history_limit(mut self) -> Self {
        self.history_limit = None;
        self
    }
}
