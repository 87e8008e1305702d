//! Retry with exponential backoff and jitter.

use crate::config::RetryConfig;
use crate::error::{CatalogError, ConfigureError, CrawlSyncError, ResolveError};
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Errors that know whether a repeat attempt may succeed.
pub trait Retryable {
    /// Whether repeating the failed operation may succeed
    fn is_retryable(&self) -> bool;
}

impl Retryable for ResolveError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}

impl Retryable for ConfigureError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}

impl Retryable for CatalogError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl Retryable for CrawlSyncError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}

/// Delay before the attempt following failed attempt `attempt` (1-based).
///
/// Without jitter this is `base * 2^(attempt-1)` capped at `max`. With
/// jitter it is drawn from `[d/2, d]` for that value `d`, so retries from
/// concurrent invocations spread out but never shrink below half.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let millis = config
        .base_delay_ms
        .saturating_mul(2_u64.saturating_pow(exponent))
        .min(config.max_delay_ms);

    if !config.jitter || millis == 0 {
        return Duration::from_millis(millis);
    }

    let half = millis / 2;
    let spread = millis.saturating_sub(half);
    Duration::from_millis(half.saturating_add(rand::rng().random_range(0..=spread)))
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt budget is spent. The last error is returned.
///
/// `operation` is called afresh for every attempt, so it must not carry
/// state from a failed attempt into the next.
///
/// # Example
/// ```rust
/// use crawlsync_core::config::RetryConfig;
/// use crawlsync_core::error::ResolveError;
/// use crawlsync_core::retry::retry_with_backoff;
///
/// # async fn example() {
/// let config = RetryConfig::default().without_jitter();
/// let value = retry_with_backoff(&config, "read secret", || async {
///     Ok::<_, ResolveError>(42)
/// })
/// .await;
/// assert_eq!(value.ok(), Some(42));
/// # }
/// ```
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts || !e.is_retryable() => return Err(e),
            Err(e) => {
                let delay = backoff_delay(config, attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Attempt failed, retrying: {}",
                    e
                );
                tokio::time::sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}
