//! Retry logic with exponential backoff
//!
//! Opt-in bounded retries for transient transport failures. The
//! default configuration performs no retries at all: a failed probe
//! degrades its row and the batch moves on. When enabled, delays grow
//! exponentially up to a cap, with optional jitter to avoid hammering
//! a recovering target in lockstep from every worker.

use crate::config::RetryConfig;
use crate::error::TransportError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets) should return
/// `true`; permanent ones (a missing fetch binary) `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for TransportError {
    fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout { .. } => true,
            TransportError::Network { source, .. } => source.is_timeout() || source.is_connect(),
            // The fetch binary is missing or not executable; retrying
            // cannot change that
            TransportError::Spawn { .. } => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// `max_attempts` counts retries after the initial try; zero means the
/// operation runs exactly once. The last error is returned once the
/// attempts are exhausted or a non-retryable error occurs.
pub async fn fetch_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay();

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Probe succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Probe failed, retrying"
                );

                let jittered = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(jittered).await;

                delay = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
                    .min(config.max_delay());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Add random jitter to a delay
///
/// Uniformly distributed between 0% and 100% of the delay, so the
/// actual wait lands between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
