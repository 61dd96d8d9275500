//! Run records: the terminal outcome of one queued invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::RunId;
use super::task::{TaskArgs, TaskName, TaskOutput};

/// Why an invocation ended in failure.
///
/// Failures are data: they are recorded in the ledger and never returned as
/// `Err` to the caller of `next_batch()`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailure {
    /// The task returned an error on its last attempt.
    #[error("{message}")]
    Task { message: String },

    /// The task panicked on its last attempt.
    #[error("task panicked: {message}")]
    Panicked { message: String },

    /// The last attempt exceeded the per-attempt timeout.
    #[error("attempt timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    /// Dependencies were still unmet once the deferral limit was reached.
    #[error("dependencies not met after {deferrals} deferrals: {missing:?}")]
    DependencyUnmet {
        missing: Vec<TaskName>,
        deferrals: u32,
    },

    /// Cancellation was requested before the invocation could finish.
    #[error("cancelled")]
    Cancelled,

    /// The queued item names a task the registry does not know.
    #[error("task '{task}' is not registered")]
    TaskNotFound { task: TaskName },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum RunOutcome {
    Success(TaskOutput),
    Failure(RunFailure),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    pub fn output(&self) -> Option<&TaskOutput> {
        match self {
            RunOutcome::Success(v) => Some(v),
            RunOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            RunOutcome::Success(_) => None,
            RunOutcome::Failure(f) => Some(f),
        }
    }
}

/// One entry of the run ledger. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub task: TaskName,
    pub args: TaskArgs,
    pub timestamp: DateTime<Utc>,
    pub outcome: RunOutcome,

    /// Invocation attempts made. Zero when the task never ran (dependency
    /// drop, cancellation before the first attempt).
    pub attempts: u32,
}

impl RunRecord {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}
