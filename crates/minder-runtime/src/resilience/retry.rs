//! Retry with exponential backoff.
//!
//! The loop is an explicit state machine over an attempt counter and a
//! backoff schedule rather than exception-driven control flow: retry counts
//! and delays are unit-testable without wall-clock time by injecting a
//! [`Sleeper`]. Only errors the provider taxonomy marks transient are
//! retried; auth and malformed-response failures surface immediately.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};

use crate::providers::ProviderError;

/// Retry policy for provider calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt, so `max_retries + 1` calls at most.
    pub max_retries: u32,

    /// First backoff delay; doubles each retry.
    pub base_delay: Duration,

    /// Backoff cap.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// The delay schedule: `base, base*2, base*4, ...` capped at
    /// `max_delay`, one entry per permitted retry.
    pub fn backoff(&self) -> impl Iterator<Item = Duration> {
        ExponentialBuilder::default()
            .with_factor(2.0)
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries as usize)
            .build()
    }
}

/// Sleep abstraction so tests can observe delays instead of waiting them.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Drive an attempt closure through the retry policy.
///
/// The closure receives the zero-based attempt number. The final error is
/// returned unchanged once retries are exhausted or the error is not
/// transient.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut attempt_fn: F,
) -> Result<T, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut backoff = policy.backoff();
    let mut attempt: u32 = 0;

    loop {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < policy.max_retries => {
                let delay = backoff.next().unwrap_or(policy.max_delay);
                tracing::debug!(
                    attempt,
                    delay = %humantime::format_duration(delay),
                    error = %error,
                    "transient provider error, backing off"
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
