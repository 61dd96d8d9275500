//! SchedulerBuilder: wiring and start-up validation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{BatchScheduler, RetryExecutor};
use crate::config::SchedulerConfig;
use crate::domain::{TaskDefinition, TaskName};
use crate::error::{HeddleError, RegistryError};
use crate::handler::TaskFn;
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};
use crate::registry::TaskRegistry;

/// Builds a `BatchScheduler`.
///
/// ```ignore
/// let scheduler = SchedulerBuilder::new()
///     .config(SchedulerConfig::default().with_batch_size(2))
///     .register("fetch", fetch, 3, Vec::<TaskName>::new())?
///     .register("process", process, 2, ["fetch"])?
///     .expect_tasks(&["fetch", "process"])
///     .validate_graph()
///     .build()?;
/// ```
///
/// By default dependencies are only checked when a task is first enqueued.
/// `validate_graph()` and `expect_tasks()` move those checks to `build()`.
pub struct SchedulerBuilder {
    registry: TaskRegistry,
    config: SchedulerConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    cancel: Option<CancellationToken>,
    expected_tasks: Vec<TaskName>,
    validate_graph: bool,
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self {
            registry: TaskRegistry::new(),
            config: SchedulerConfig::default(),
            clock: None,
            ids: None,
            cancel: None,
            expected_tasks: Vec::new(),
            validate_graph: false,
        }
    }

    /// Start from an existing registry, e.g. a clone of one used by a
    /// previous scheduler.
    pub fn registry(mut self, registry: TaskRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Share a cancellation token with the host.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn register<I, D>(
        mut self,
        name: impl Into<TaskName>,
        handler: Arc<dyn TaskFn>,
        priority: i32,
        dependencies: I,
    ) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = D>,
        D: Into<TaskName>,
    {
        self.registry.register(name, handler, priority, dependencies)?;
        Ok(self)
    }

    pub fn register_definition(mut self, definition: TaskDefinition) -> Result<Self, RegistryError> {
        self.registry.register_definition(definition)?;
        Ok(self)
    }

    /// Task names that must be registered when `build()` runs.
    pub fn expect_tasks(mut self, names: &[&str]) -> Self {
        self.expected_tasks = names.iter().map(|n| TaskName::new(*n)).collect();
        self
    }

    /// Check the whole dependency graph in `build()`.
    pub fn validate_graph(mut self) -> Self {
        self.validate_graph = true;
        self
    }

    pub fn build(self) -> Result<BatchScheduler, HeddleError> {
        self.config.validate()?;

        let missing = self.registry.missing(&self.expected_tasks);
        if !missing.is_empty() {
            return Err(RegistryError::MissingExpectedTasks(missing).into());
        }
        if self.validate_graph {
            self.registry.validate()?;
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));
        let executor =
            RetryExecutor::new(clock, ids).with_attempt_timeout(self.config.attempt_timeout);

        tracing::debug!(
            tasks = self.registry.len(),
            batch_size = self.config.batch_size,
            max_concurrency = self.config.max_concurrency,
            "scheduler built"
        );

        Ok(BatchScheduler::from_parts(
            self.registry,
            self.config,
            executor,
            self.cancel.unwrap_or_default(),
        ))
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
