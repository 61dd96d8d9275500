//! Dependency resolution against the run ledger.

use crate::domain::{TaskDefinition, TaskName};
use crate::ledger::RunLedger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every dependency has a successful run.
    Ready,
    /// These dependencies have no successful run yet.
    Blocked(Vec<TaskName>),
}

impl Resolution {
    pub fn is_ready(&self) -> bool {
        matches!(self, Resolution::Ready)
    }
}

/// Pure predicate over a definition and the ledger. No partial credit: one
/// unmet dependency blocks the task.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, definition: &TaskDefinition, ledger: &RunLedger) -> Resolution {
        let missing: Vec<TaskName> = definition
            .dependencies()
            .iter()
            .filter(|dep| !ledger.has_succeeded(dep))
            .cloned()
            .collect();

        if missing.is_empty() {
            Resolution::Ready
        } else {
            Resolution::Blocked(missing)
        }
    }

    pub fn is_satisfied(&self, definition: &TaskDefinition, ledger: &RunLedger) -> bool {
        definition
            .dependencies()
            .iter()
            .all(|dep| ledger.has_succeeded(dep))
    }
}
