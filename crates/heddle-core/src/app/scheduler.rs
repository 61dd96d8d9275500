//! Batch scheduler: drains the queue in priority ordered batches.
//!
//! One `next_batch()` call:
//! 1. pulls items from the queue until `batch_size` of them are planned,
//!    checking dependencies against the ledger as it was when the call
//!    started (completions inside the batch never unblock items of the same
//!    batch),
//! 2. defers blocked items (they go back to the queue at the end of the
//!    call) or drops them once the deferral limit is spent,
//! 3. runs the ready items through the `RetryExecutor`,
//! 4. appends the records to the ledger in drain order.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use super::{DependencyResolver, Resolution, RetryExecutor};
use crate::config::SchedulerConfig;
use crate::domain::{
    RunFailure, RunOutcome, RunRecord, SchedulerState, TaskArgs, TaskDefinition, TaskName,
};
use crate::error::{ConfigError, HeddleError, RegistryError};
use crate::handler::TaskFn;
use crate::ledger::RunLedger;
use crate::observability::RunStatistics;
use crate::queue::{ExecutionQueue, QueueItem};
use crate::registry::TaskRegistry;

/// Records produced by one `next_batch()` call.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// 1-based batch number.
    pub index: usize,

    /// Terminal records, in drain order.
    pub records: Vec<RunRecord>,

    /// Items put back because their dependencies were not yet satisfied.
    pub deferred: Vec<TaskName>,
}

impl BatchReport {
    pub fn successes(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.records.len() - self.successes()
    }
}

/// What the planning step decided for one drained item.
enum Planned {
    Run(QueueItem, Arc<TaskDefinition>),
    Done(RunRecord),
}

pub struct BatchScheduler {
    registry: TaskRegistry,
    queue: ExecutionQueue,
    ledger: RunLedger,
    config: SchedulerConfig,
    executor: RetryExecutor,
    resolver: DependencyResolver,
    cancel: CancellationToken,
    state: SchedulerState,
    batches: usize,
}

impl BatchScheduler {
    /// Scheduler with the system clock and a fresh cancellation token.
    pub fn new(registry: TaskRegistry, config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let executor = RetryExecutor::system().with_attempt_timeout(config.attempt_timeout);
        Ok(Self::from_parts(
            registry,
            config,
            executor,
            CancellationToken::new(),
        ))
    }

    /// Assemble from already validated parts. Used by `SchedulerBuilder`.
    pub(crate) fn from_parts(
        registry: TaskRegistry,
        config: SchedulerConfig,
        executor: RetryExecutor,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            queue: ExecutionQueue::new(),
            ledger: RunLedger::new(),
            config,
            executor,
            resolver: DependencyResolver::new(),
            cancel,
            state: SchedulerState::Idle,
            batches: 0,
        }
    }

    pub fn register<I, D>(
        &mut self,
        name: impl Into<TaskName>,
        handler: Arc<dyn TaskFn>,
        priority: i32,
        dependencies: I,
    ) -> Result<Arc<TaskDefinition>, RegistryError>
    where
        I: IntoIterator<Item = D>,
        D: Into<TaskName>,
    {
        self.registry.register(name, handler, priority, dependencies)
    }

    pub fn register_definition(
        &mut self,
        definition: TaskDefinition,
    ) -> Result<Arc<TaskDefinition>, RegistryError> {
        self.registry.register_definition(definition)
    }

    /// Queue one invocation of `task`.
    ///
    /// The task's dependency closure is validated here, on first use. The
    /// returned number is the item's queue sequence.
    pub fn enqueue(
        &mut self,
        task: impl Into<TaskName>,
        args: TaskArgs,
    ) -> Result<u64, HeddleError> {
        let task = task.into();
        if self.state.is_terminal() {
            return Err(HeddleError::SchedulerExhausted(task));
        }
        self.registry.validate_closure(&task)?;
        let definition = self.registry.lookup(&task)?;
        let seq = self.queue.enqueue(definition, args);
        tracing::debug!(task = %task, seq, priority = definition.priority(), "enqueued");
        Ok(seq)
    }

    /// Produce the next batch, or `None` once the queue is exhausted or
    /// cancellation was requested.
    pub async fn next_batch(&mut self) -> Option<BatchReport> {
        if self.state.is_terminal() {
            return None;
        }
        if self.cancel.is_cancelled() {
            tracing::info!(still_queued = self.queue.len(), "cancelled, scheduler exhausted");
            self.state = SchedulerState::Exhausted;
            return None;
        }

        let (planned, deferred) = self.plan();
        if planned.is_empty() && deferred.is_empty() {
            tracing::info!(batches = self.batches, "queue exhausted");
            self.state = SchedulerState::Exhausted;
            return None;
        }

        self.state = SchedulerState::Draining;
        self.batches += 1;
        let index = self.batches;
        tracing::info!(
            batch = index,
            planned = planned.len(),
            deferred = deferred.len(),
            "batch started"
        );

        let results = self.run_planned(planned).await;

        let mut records = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(record) => records.push(record),
                Err(item) => {
                    tracing::debug!(task = %item.task, "not started, returned to queue");
                    self.queue.requeue(item);
                }
            }
        }

        let deferred_names: Vec<TaskName> = deferred.iter().map(|i| i.task.clone()).collect();
        for mut item in deferred {
            item.deferrals += 1;
            self.queue.requeue(item);
        }

        for record in &records {
            self.ledger.append(record.clone());
        }

        let report = BatchReport {
            index,
            records,
            deferred: deferred_names,
        };
        tracing::info!(
            batch = index,
            succeeded = report.successes(),
            failed = report.failures(),
            deferred = report.deferred.len(),
            still_queued = self.queue.len(),
            "batch finished"
        );

        if self.cancel.is_cancelled() {
            tracing::info!(still_queued = self.queue.len(), "cancelled, scheduler exhausted");
            self.state = SchedulerState::Exhausted;
        }

        Some(report)
    }

    /// Drive `next_batch()` until it returns `None`.
    pub async fn run_to_completion(&mut self) -> Vec<BatchReport> {
        let mut reports = Vec::new();
        while let Some(report) = self.next_batch().await {
            reports.push(report);
        }
        reports
    }

    /// Pull items until `batch_size` are planned or the queue runs dry.
    /// Deferred items are held aside so this call never draws them again.
    fn plan(&mut self) -> (Vec<Planned>, Vec<QueueItem>) {
        let batch_size = self.config.batch_size;
        let mut planned: Vec<Planned> = Vec::new();
        let mut deferred: Vec<QueueItem> = Vec::new();
        // drawn this call and not dropped: they may still succeed
        let mut in_hand: HashMap<TaskName, usize> = HashMap::new();

        while planned.len() < batch_size {
            let drained = self.queue.drain_batch(batch_size - planned.len());
            if drained.is_empty() {
                break;
            }
            for item in &drained {
                *in_hand.entry(item.task.clone()).or_default() += 1;
            }

            for item in drained {
                let Some(definition) = self.registry.get(&item.task).cloned() else {
                    tracing::warn!(task = %item.task, "queued task is not registered");
                    release(&mut in_hand, &item.task);
                    let failure = RunFailure::TaskNotFound {
                        task: item.task.clone(),
                    };
                    planned.push(Planned::Done(self.executor.make_record(
                        item.task,
                        item.args,
                        RunOutcome::Failure(failure),
                        0,
                    )));
                    continue;
                };

                match self.resolver.check(&definition, &self.ledger) {
                    Resolution::Ready => planned.push(Planned::Run(item, definition)),
                    Resolution::Blocked(missing) => {
                        let waiting = missing
                            .iter()
                            .any(|dep| self.queue.contains_task(dep) || in_hand.contains_key(dep));
                        if item.deferrals >= self.config.max_deferrals && !waiting {
                            tracing::warn!(
                                task = %item.task,
                                deferrals = item.deferrals,
                                missing = ?missing,
                                "dependencies unmet, dropping"
                            );
                            release(&mut in_hand, &item.task);
                            let failure = RunFailure::DependencyUnmet {
                                missing,
                                deferrals: item.deferrals,
                            };
                            planned.push(Planned::Done(self.executor.make_record(
                                item.task,
                                item.args,
                                RunOutcome::Failure(failure),
                                0,
                            )));
                        } else {
                            tracing::debug!(
                                task = %item.task,
                                deferrals = item.deferrals,
                                missing = ?missing,
                                "dependencies unmet, deferring"
                            );
                            deferred.push(item);
                        }
                    }
                }
            }
        }

        (planned, deferred)
    }

    /// Run planned items with at most `max_concurrency` in flight. Results
    /// keep plan order. Items not started because of cancellation come back
    /// as `Err`.
    async fn run_planned(&self, planned: Vec<Planned>) -> Vec<Result<RunRecord, QueueItem>> {
        let executor = &self.executor;
        let cancel = &self.cancel;
        let default_retry = &self.config.retry;

        stream::iter(planned)
            .map(|planned| async move {
                match planned {
                    Planned::Done(record) => Ok(record),
                    Planned::Run(item, definition) => {
                        if cancel.is_cancelled() {
                            return Err(item);
                        }
                        let policy = definition.retry().unwrap_or(default_retry);
                        Ok(executor
                            .execute(&definition, &item.args, policy, cancel)
                            .await)
                    }
                }
            })
            .buffered(self.config.max_concurrency)
            .collect()
            .await
    }

    pub fn statistics(&self) -> RunStatistics {
        self.ledger
            .statistics(self.registry.len(), self.queue.len())
    }

    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Token that stops the scheduler between items and between retries.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

fn release(in_hand: &mut HashMap<TaskName, usize>, task: &TaskName) {
    if let Some(count) = in_hand.get_mut(task) {
        *count -= 1;
        if *count == 0 {
            in_hand.remove(task);
        }
    }
}
