use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::{TaskArgs, TaskOutput};
use crate::error::TaskError;
use crate::handler::TaskFn;

/// Emits a `tracing` debug event with the elapsed time of every invocation.
pub struct Timed<T> {
    inner: T,
}

impl<T> Timed<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: TaskFn> TaskFn for Timed<T> {
    async fn invoke(&self, args: &TaskArgs) -> Result<TaskOutput, TaskError> {
        let started = Instant::now();
        let result = self.inner.invoke(args).await;
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "task invocation timed"
        );
        result
    }
}
