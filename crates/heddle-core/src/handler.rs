//! Task callables.
//!
//! Every registered task is an `Arc<dyn TaskFn>`. Closures can be adapted
//! with [`task_fn`] (async) or [`sync_task_fn`] (blocking-free sync code).

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{TaskArgs, TaskOutput};
use crate::error::TaskError;

/// A unit of work the scheduler can invoke.
///
/// Invocations may be retried, so implementations should tolerate being
/// called more than once with the same arguments.
#[async_trait]
pub trait TaskFn: Send + Sync {
    async fn invoke(&self, args: &TaskArgs) -> Result<TaskOutput, TaskError>;
}

#[async_trait]
impl<T: TaskFn + ?Sized> TaskFn for Arc<T> {
    async fn invoke(&self, args: &TaskArgs) -> Result<TaskOutput, TaskError> {
        (**self).invoke(args).await
    }
}

/// Adapter for async closures. Built with [`task_fn`].
pub struct FnTask<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> TaskFn for FnTask<F>
where
    F: Fn(TaskArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutput, TaskError>> + Send + 'static,
{
    async fn invoke(&self, args: &TaskArgs) -> Result<TaskOutput, TaskError> {
        (self.f)(args.clone()).await
    }
}

/// Adapter for synchronous closures. Built with [`sync_task_fn`].
pub struct SyncFnTask<F> {
    f: F,
}

#[async_trait]
impl<F> TaskFn for SyncFnTask<F>
where
    F: Fn(&TaskArgs) -> Result<TaskOutput, TaskError> + Send + Sync + 'static,
{
    async fn invoke(&self, args: &TaskArgs) -> Result<TaskOutput, TaskError> {
        (self.f)(args)
    }
}

/// Build a task from an async closure. The closure receives an owned copy of
/// the arguments so the returned future can be `'static`.
///
/// ```ignore
/// let fetch = task_fn(|args| async move {
///     let url = args["url"].as_str().ok_or("missing url")?;
///     Ok::<_, TaskError>(json!(format!("loaded {url}")))
/// });
/// ```
pub fn task_fn<F, Fut>(f: F) -> FnTask<F>
where
    F: Fn(TaskArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutput, TaskError>> + Send + 'static,
{
    FnTask { f }
}

/// Build a task from a synchronous closure.
pub fn sync_task_fn<F>(f: F) -> SyncFnTask<F>
where
    F: Fn(&TaskArgs) -> Result<TaskOutput, TaskError> + Send + Sync + 'static,
{
    SyncFnTask { f }
}
