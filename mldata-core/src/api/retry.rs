// mldata-core/src/api/retry.rs

//! Retry policy for remote requests.
//!
//! Transient failures (connection errors, timeouts, 5xx responses) are
//! retried with exponential backoff and a small deterministic jitter.

use std::future::Future;
use std::time::Duration;

use crate::config::ServerConfig;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Backoff multiplier applied per attempt.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for RetryConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            max_retries: server.max_retries,
            initial_delay: Duration::from_millis(server.retry_delay_ms),
            max_delay: Duration::from_millis(server.max_retry_delay_ms),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries. Used for non-idempotent requests.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt >= self.max_retries {
            return Duration::ZERO;
        }

        let exponential = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt as i32);
        let capped = exponential.min(self.max_delay.as_secs_f64());

        if self.jitter {
            // up to 25% extra
            Duration::from_secs_f64(capped * (1.0 + jitter_fraction(attempt) * 0.25))
        } else {
            Duration::from_secs_f64(capped)
        }
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Deterministic value in [0, 1) derived from the attempt number.
fn jitter_fraction(seed: u32) -> f64 {
    let x = seed.wrapping_mul(1103515245).wrapping_add(12345);
    (x as f64) / (u32::MAX as f64 + 1.0)
}

/// Outcome of one attempt of a retryable operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Ok(T),
    /// Operation failed with a transient error.
    Retry(E),
    /// Operation failed permanently.
    Fail(E),
}

/// Runs `operation` until it succeeds, fails permanently, or the policy is
/// exhausted. The last error is returned on exhaustion.
pub async fn retry_async<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RetryResult<T, E>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            RetryResult::Ok(value) => return Ok(value),
            RetryResult::Fail(error) => return Err(error),
            RetryResult::Retry(error) => {
                if !config.should_retry(attempt) {
                    return Err(error);
                }
                tokio::time::sleep(config.delay_for_attempt(attempt)).await;
                attempt += 1;
            }
        }
    }
}
