use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::handler::TaskFn;
use crate::queue::RetryPolicy;

/// Opaque argument bundle passed to a task invocation.
pub type TaskArgs = serde_json::Value;

/// Value produced by a successful task invocation.
pub type TaskOutput = serde_json::Value;

/// Unique key of a registered task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TaskName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Static definition of a task: what to call, how urgent it is, and what
/// must have succeeded before it may run.
///
/// Immutable once built; the registry hands out shared `Arc`s.
#[derive(Clone)]
pub struct TaskDefinition {
    name: TaskName,
    handler: Arc<dyn TaskFn>,
    priority: i32,
    dependencies: Vec<TaskName>,
    retry: Option<RetryPolicy>,
}

impl TaskDefinition {
    pub fn new<I, D>(
        name: impl Into<TaskName>,
        handler: Arc<dyn TaskFn>,
        priority: i32,
        dependencies: I,
    ) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<TaskName>,
    {
        Self {
            name: name.into(),
            handler,
            priority,
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            retry: None,
        }
    }

    /// Override the scheduler's retry policy for this task only.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn name(&self) -> &TaskName {
        &self.name
    }

    pub fn handler(&self) -> &Arc<dyn TaskFn> {
        &self.handler
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn dependencies(&self) -> &[TaskName] {
        &self.dependencies
    }

    pub fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("dependencies", &self.dependencies)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
