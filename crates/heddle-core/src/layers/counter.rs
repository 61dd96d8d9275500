use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::domain::{TaskArgs, TaskOutput};
use crate::error::TaskError;
use crate::handler::TaskFn;

/// Counts invocations of the inner task, successful or not.
pub struct CallCounter<T> {
    inner: T,
    calls: AtomicU64,
}

impl<T> CallCounter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: TaskFn> TaskFn for CallCounter<T> {
    async fn invoke(&self, args: &TaskArgs) -> Result<TaskOutput, TaskError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.invoke(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::sync_task_fn;
    use serde_json::json;

    #[tokio::test]
    async fn counts_successes_and_failures() {
        let counter = CallCounter::new(sync_task_fn(|args| {
            if args["fail"].as_bool().unwrap_or(false) {
                Err(TaskError::new("asked to fail"))
            } else {
                Ok(json!("ok"))
            }
        }));

        counter.invoke(&json!({})).await.unwrap();
        counter.invoke(&json!({"fail": true})).await.unwrap_err();
        assert_eq!(counter.calls(), 2);

        counter.reset();
        assert_eq!(counter.calls(), 0);
    }
}
