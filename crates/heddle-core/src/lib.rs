//! heddle-core
//!
//! Dependency-aware batch scheduling for named tasks.
//!
//! # Modules
//! - **domain**: task names/definitions, run records, ids, scheduler state
//! - **handler**: the `TaskFn` trait every task callable implements
//! - **registry**: `TaskRegistry` (static task definitions)
//! - **queue**: `ExecutionQueue` (priority ordered pending invocations) and `RetryPolicy`
//! - **ledger**: `RunLedger` (append-only run history)
//! - **app**: `RetryExecutor`, `DependencyResolver`, `BatchScheduler`, `SchedulerBuilder`
//! - **layers**: optional `TaskFn` wrappers (memoization, call counting, timing)
//! - **ports**: injected clock and id generation
//! - **config**: `SchedulerConfig`
//! - **observability**: `RunStatistics`
//! - **error**: error types
//!
//! # Flow
//! register tasks -> enqueue invocations -> `next_batch()` until `None`.
//!
//! ```ignore
//! let mut scheduler = SchedulerBuilder::new().build()?;
//! scheduler.register("fetch", Arc::new(sync_task_fn(|_| Ok(json!("data")))), 3, Vec::<TaskName>::new())?;
//! scheduler.enqueue("fetch", json!({}))?;
//! while let Some(report) = scheduler.next_batch().await {
//!     for record in &report.records {
//!         println!("{} -> {:?}", record.task, record.outcome);
//!     }
//! }
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod handler;
pub mod layers;
pub mod ledger;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod registry;

pub use app::{BatchReport, BatchScheduler, DependencyResolver, Resolution, RetryExecutor, SchedulerBuilder};
pub use config::SchedulerConfig;
pub use domain::{
    RunFailure, RunId, RunOutcome, RunRecord, SchedulerState, TaskArgs, TaskDefinition, TaskName,
    TaskOutput,
};
pub use error::{ConfigError, HeddleError, RegistryError, TaskError};
pub use handler::{FnTask, SyncFnTask, TaskFn, sync_task_fn, task_fn};
pub use layers::{CallCounter, Memoized, TaskFnExt, Timed};
pub use ledger::RunLedger;
pub use observability::RunStatistics;
pub use queue::{ExecutionQueue, QueueItem, RetryPolicy};
pub use registry::TaskRegistry;
