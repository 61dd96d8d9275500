use serde::{Deserialize, Serialize};

/// Scheduler counts for host-side reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub registered: usize,
    pub completed_success: usize,
    pub completed_failure: usize,
    pub still_queued: usize,
}

impl RunStatistics {
    pub fn completed(&self) -> usize {
        self.completed_success + self.completed_failure
    }
}
