//! Run ledger: append-only history of terminal outcomes.

use std::collections::HashSet;

use crate::domain::{RunRecord, TaskName};
use crate::observability::RunStatistics;

/// Append-only record of completed and failed invocations.
///
/// Keeps a set of succeeded task names next to the record list so that
/// `has_succeeded` does not scan history. There is no removal or update
/// operation.
#[derive(Debug, Default)]
pub struct RunLedger {
    records: Vec<RunRecord>,
    succeeded: HashSet<TaskName>,
    failures: usize,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: RunRecord) {
        if record.is_success() {
            self.succeeded.insert(record.task.clone());
        } else {
            self.failures += 1;
        }
        self.records.push(record);
    }

    /// At least one `Success` record exists for `task`.
    pub fn has_succeeded(&self, task: &TaskName) -> bool {
        self.succeeded.contains(task)
    }

    /// All records in append order.
    pub fn all_records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn records_for<'a>(
        &'a self,
        task: &TaskName,
    ) -> impl Iterator<Item = &'a RunRecord> + use<'a> {
        let task = task.clone();
        self.records.iter().filter(move |r| r.task == task)
    }

    pub fn success_count(&self) -> usize {
        self.records.len() - self.failures
    }

    pub fn failure_count(&self) -> usize {
        self.failures
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot counts. The ledger itself does not know about the registry
    /// or the queue, so the caller passes those sizes in.
    pub fn statistics(&self, registered: usize, still_queued: usize) -> RunStatistics {
        RunStatistics {
            registered,
            completed_success: self.success_count(),
            completed_failure: self.failure_count(),
            still_queued,
        }
    }
}
