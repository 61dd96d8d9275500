//! Lifecycle of a `BatchScheduler`.

use serde::{Deserialize, Serialize};

/// Scheduler state.
///
/// State transitions:
/// - Idle -> Draining (first `next_batch()` call that finds work)
/// - Draining -> Draining (while items remain)
/// - Idle | Draining -> Exhausted (a drain comes back empty, or cancellation)
///
/// Exhausted is terminal: a scheduler is a one-shot sequence of batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// No batch produced yet.
    Idle,

    /// Actively producing batches.
    Draining,

    /// Queue empty (or cancelled); no more batches.
    Exhausted,
}

impl SchedulerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SchedulerState::Exhausted)
    }
}
