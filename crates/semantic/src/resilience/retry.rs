//! Retry with exponential backoff for transient embedding failures.
//!
//! Only errors the caller classifies as retryable are attempted again; everything
//! else returns straight away so a bad token doesn't burn the whole retry budget.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each subsequent one.
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Add up to 50% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Single attempt, no backoff.
    pub fn disabled() -> Self {
        Self::default().with_max_retries(0)
    }
}

/// Outcome of a retried operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// Last result observed.
    pub result: Result<T, E>,
    /// Attempts made (1 = no retries needed).
    pub attempts: u32,
    /// Wall time across all attempts and delays.
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent. The closure receives the zero-based attempt number.
pub async fn execute_with_retry_async<T, E, F, Fut, R>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: R,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        let result = operation(attempt).await;
        let give_up = match &result {
            Ok(_) => true,
            Err(err) => attempt >= config.max_retries || !should_retry(err),
        };

        if give_up {
            return RetryResult {
                result,
                attempts: attempt + 1,
                total_duration: start.elapsed(),
            };
        }

        tokio::time::sleep(calculate_delay(config, attempt)).await;
        attempt += 1;
    }
}

/// Delay before retry number `attempt + 1`.
fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base = u64::try_from(config.base_delay.as_millis()).unwrap_or(u64::MAX);
    let cap = u64::try_from(config.max_delay.as_millis()).unwrap_or(u64::MAX);
    let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
    let delay = exponential.min(cap);

    let jittered = if config.jitter && delay > 0 {
        delay.saturating_add(fastrand::u64(0..=delay / 2))
    } else {
        delay
    };
    Duration::from_millis(jittered.min(cap))
}
