//! Retry policy: attempt budget and backoff delays.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Retry policy for task invocations.
///
/// `multiplier = 1.0` gives constant backoff; anything larger grows the delay
/// exponentially, capped by `max_delay` when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` means no retry.
    pub max_attempts: u32,

    /// Delay after the first failed attempt.
    pub base_delay: Duration,

    /// Backoff multiplier applied per additional failure.
    pub multiplier: f64,

    /// Upper bound for any single delay.
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 1.0,
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    /// Same delay between every attempt.
    pub fn constant(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            multiplier: 1.0,
            max_delay: None,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
            max_delay: None,
        }
    }

    /// Single attempt, no retry.
    pub fn no_retry() -> Self {
        Self::constant(1, Duration::ZERO)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Delay to wait after `failed_attempts` failures (1-indexed).
    ///
    /// delay = base_delay * multiplier^(failed_attempts - 1), capped by max_delay.
    ///
    /// Example with base_delay=2s, multiplier=2.0:
    /// - 1 failure: 2s
    /// - 2 failures: 4s
    /// - 3 failures: 8s
    pub fn next_delay(&self, failed_attempts: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = failed_attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "retry.multiplier must be a finite value >= 1.0, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }
}
