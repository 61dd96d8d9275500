use thiserror::Error;

use crate::domain::TaskName;

/// Errors raised while wiring the task graph.
///
/// These are the only caller-facing errors of the engine: they point at a
/// mistake in how tasks were registered or enqueued, not at an operational
/// condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("task '{0}' is already registered")]
    DuplicateTask(TaskName),

    #[error("task '{task}' depends on unregistered task '{dependency}'")]
    UnknownDependency { task: TaskName, dependency: TaskName },

    #[error("task '{0}' is not registered")]
    TaskNotFound(TaskName),

    #[error("dependency cycle detected: {}", format_cycle(.0))]
    DependencyCycle(Vec<TaskName>),

    #[error("task '{task}' has an invalid retry policy: {reason}")]
    InvalidRetryPolicy { task: TaskName, reason: String },

    #[error("expected tasks are not registered: {0:?}")]
    MissingExpectedTasks(Vec<TaskName>),
}

fn format_cycle(path: &[TaskName]) -> String {
    path.iter()
        .map(TaskName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid scheduler config: {0}")]
    Invalid(String),

    #[error("failed to parse scheduler config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum HeddleError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot enqueue '{0}': scheduler is exhausted")]
    SchedulerExhausted(TaskName),
}

/// Error returned by a task invocation.
///
/// The executor does not classify errors: every `TaskError` is retried the
/// same way until the attempt budget runs out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("json: {err}"))
    }
}
