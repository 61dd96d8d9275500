//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::queue::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum records produced by one `next_batch()` call.
    pub batch_size: usize,

    /// How many times an item with unmet dependencies is put back before it
    /// is dropped with a `DependencyUnmet` failure.
    pub max_deferrals: u32,

    /// Concurrent invocations within one batch. `1` runs items sequentially.
    pub max_concurrency: usize,

    /// Default retry policy; a task definition may override it.
    pub retry: RetryPolicy,

    /// Per-attempt timeout. `None` lets an attempt run as long as it needs.
    pub attempt_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            max_deferrals: 3,
            max_concurrency: 1,
            retry: RetryPolicy::default(),
            attempt_timeout: None,
        }
    }
}

impl SchedulerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_deferrals(mut self, max_deferrals: u32) -> Self {
        self.max_deferrals = max_deferrals;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.attempt_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid(
                "attempt_timeout must be greater than zero".to_string(),
            ));
        }
        self.retry.validate()
    }
}
