//! Retry executor: one queued invocation -> one terminal `RunRecord`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::domain::{RunFailure, RunOutcome, RunRecord, TaskArgs, TaskDefinition, TaskName, TaskOutput};
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};
use crate::queue::RetryPolicy;

/// Runs a task with bounded retries.
///
/// Every error returned by the task is treated the same way: retried until
/// `max_attempts` is used up. A panic inside the task counts as a failed
/// attempt. Cancellation is checked before each attempt and
/// while waiting between attempts; an attempt already running is not
/// interrupted except by the optional per-attempt timeout.
#[derive(Clone)]
pub struct RetryExecutor {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    attempt_timeout: Option<Duration>,
}

impl RetryExecutor {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            clock,
            ids,
            attempt_timeout: None,
        }
    }

    /// System clock and ULID ids.
    pub fn system() -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(UlidGenerator::new(SystemClock)),
        )
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub async fn execute(
        &self,
        definition: &TaskDefinition,
        args: &TaskArgs,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> RunRecord {
        let task = definition.name();
        let max_attempts = policy.max_attempts.max(1);
        let mut attempts = 0u32;

        let failure = loop {
            if cancel.is_cancelled() {
                break RunFailure::Cancelled;
            }

            attempts += 1;
            match self.attempt(definition, args).await {
                Ok(output) => {
                    tracing::debug!(task = %task, attempt = attempts, "task succeeded");
                    return self.make_record(
                        task.clone(),
                        args.clone(),
                        RunOutcome::Success(output),
                        attempts,
                    );
                }
                Err(failure) if attempts >= max_attempts => break failure,
                Err(failure) => {
                    let delay = policy.next_delay(attempts);
                    tracing::warn!(
                        task = %task,
                        attempt = attempts,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "attempt failed, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break RunFailure::Cancelled,
                        _ = sleep(delay) => {}
                    }
                }
            }
        };

        tracing::warn!(task = %task, attempts, error = %failure, "task failed");
        self.make_record(
            task.clone(),
            args.clone(),
            RunOutcome::Failure(failure),
            attempts,
        )
    }

    async fn attempt(
        &self,
        definition: &TaskDefinition,
        args: &TaskArgs,
    ) -> Result<TaskOutput, RunFailure> {
        // a panicking task is a failed attempt, not a lost batch
        let call = async {
            match AssertUnwindSafe(definition.handler().invoke(args))
                .catch_unwind()
                .await
            {
                Ok(result) => result.map_err(|e| RunFailure::Task {
                    message: e.to_string(),
                }),
                Err(payload) => Err(RunFailure::Panicked {
                    message: panic_message(payload.as_ref()),
                }),
            }
        };
        match self.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(RunFailure::TimedOut {
                    timeout_ms: limit.as_millis() as u64,
                }),
            },
            None => call.await,
        }
    }

    /// Stamp a record with a fresh run id and the current time.
    pub fn make_record(
        &self,
        task: TaskName,
        args: TaskArgs,
        outcome: RunOutcome,
        attempts: u32,
    ) -> RunRecord {
        RunRecord {
            run_id: self.ids.generate_run_id(),
            task,
            args,
            timestamp: self.clock.now(),
            outcome,
            attempts,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::handler::{TaskFn, sync_task_fn, task_fn};
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn flaky(failures: u32, calls: Arc<AtomicU32>) -> Arc<dyn TaskFn> {
        Arc::new(sync_task_fn(move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= failures {
                Err(TaskError::new(format!("failure #{n}")))
            } else {
                Ok(json!(n))
            }
        }))
    }

    fn def(handler: Arc<dyn TaskFn>) -> TaskDefinition {
        TaskDefinition::new("fetch", handler, 3, Vec::<TaskName>::new())
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::constant(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let record = RetryExecutor::system()
            .execute(&def(flaky(0, calls.clone())), &json!({}), &fast(3), &CancellationToken::new())
            .await;

        assert_eq!(record.outcome, RunOutcome::Success(json!(1)));
        assert_eq!(record.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let record = RetryExecutor::system()
            .execute(&def(flaky(2, calls.clone())), &json!({}), &fast(3), &CancellationToken::new())
            .await;

        assert!(record.is_success());
        assert_eq!(record.attempts, 3);
    }

    #[tokio::test]
    async fn always_failing_task_uses_exactly_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let record = RetryExecutor::system()
            .execute(&def(flaky(u32::MAX, calls.clone())), &json!({}), &fast(4), &CancellationToken::new())
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(record.attempts, 4);
        assert_eq!(
            record.outcome,
            RunOutcome::Failure(RunFailure::Task {
                message: "failure #4".to_string()
            })
        );
    }

    #[tokio::test]
    async fn single_attempt_means_no_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let record = RetryExecutor::system()
            .execute(&def(flaky(1, calls.clone())), &json!({}), &RetryPolicy::no_retry(), &CancellationToken::new())
            .await;

        assert!(!record.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_backoff_delay_between_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::exponential(3, Duration::from_secs(1), 2.0);

        let started = tokio::time::Instant::now();
        let record = RetryExecutor::system()
            .execute(&def(flaky(u32::MAX, calls.clone())), &json!({}), &policy, &CancellationToken::new())
            .await;
        let elapsed = started.elapsed();

        assert_eq!(record.attempts, 3);
        // 1s after the first failure, 2s after the second, none after the last
        assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(4), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempt_times_out_and_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let slow: Arc<dyn TaskFn> = Arc::new(task_fn(move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_secs(60)).await;
                Ok::<_, TaskError>(json!("late"))
            }
        }));

        let record = RetryExecutor::system()
            .with_attempt_timeout(Some(Duration::from_millis(100)))
            .execute(&def(slow), &json!({}), &fast(2), &CancellationToken::new())
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            record.outcome,
            RunOutcome::Failure(RunFailure::TimedOut { timeout_ms: 100 })
        );
    }

    #[tokio::test]
    async fn panic_is_a_retried_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let panicky: Arc<dyn TaskFn> = Arc::new(sync_task_fn(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("bad input");
            }
            Ok(json!("recovered"))
        }));

        let record = RetryExecutor::system()
            .execute(&def(panicky), &json!({}), &fast(3), &CancellationToken::new())
            .await;

        assert_eq!(record.outcome, RunOutcome::Success(json!("recovered")));
        assert_eq!(record.attempts, 2);
    }

    #[tokio::test]
    async fn panic_on_last_attempt_is_recorded() {
        let panicky: Arc<dyn TaskFn> = Arc::new(sync_task_fn(|_| -> Result<TaskOutput, TaskError> {
            panic!("always broken")
        }));

        let record = RetryExecutor::system()
            .execute(&def(panicky), &json!({}), &fast(2), &CancellationToken::new())
            .await;

        assert_eq!(record.attempts, 2);
        assert_eq!(
            record.outcome,
            RunOutcome::Failure(RunFailure::Panicked {
                message: "always broken".to_string()
            })
        );
    }

    #[tokio::test]
    async fn cancelled_before_start_makes_no_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let record = RetryExecutor::system()
            .execute(&def(flaky(0, calls.clone())), &json!({}), &fast(3), &cancel)
            .await;

        assert_eq!(record.attempts, 0);
        assert_eq!(record.outcome, RunOutcome::Failure(RunFailure::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_retry_wait() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let policy = RetryPolicy::constant(5, Duration::from_secs(60));
        let started = tokio::time::Instant::now();
        let record = RetryExecutor::system()
            .execute(&def(flaky(u32::MAX, calls.clone())), &json!({}), &policy, &cancel)
            .await;

        assert_eq!(record.attempts, 1);
        assert_eq!(record.outcome, RunOutcome::Failure(RunFailure::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn record_uses_injected_clock() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let clock = Arc::new(FixedClock::new(now));
        let executor = RetryExecutor::new(clock.clone(), Arc::new(UlidGenerator::new(clock)));

        let calls = Arc::new(AtomicU32::new(0));
        let record = executor
            .execute(&def(flaky(0, calls)), &json!({"url": "x"}), &fast(1), &CancellationToken::new())
            .await;

        assert_eq!(record.timestamp, now);
        assert_eq!(record.task, TaskName::new("fetch"));
        assert_eq!(record.args, json!({"url": "x"}));
        assert_eq!(record.run_id.as_ulid().timestamp_ms(), now.timestamp_millis() as u64);
    }
}
