//! Retry and timeout settings.

use crate::error::ProfileError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Caller-side retry policy for transient failures.
///
/// Attempt `n` (1-based) that fails is followed by a delay of
/// `base_delay * 2^(n-1)`, capped at `max_delay`. With jitter enabled the
/// delay is drawn uniformly from the upper half of that value.
///
/// # Example
/// ```rust
/// use crawlsync_core::config::RetryConfig;
///
/// let config = RetryConfig::default().with_max_attempts(5).without_jitter();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Spread each delay over the upper half of its value
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Validates retry parameters.
    ///
    /// # Errors
    /// Returns `ProfileError::Invalid` if no attempt would be made or the
    /// delay bounds are inconsistent.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.max_attempts == 0 {
            return Err(ProfileError::invalid("retry.max_attempts must be at least 1"));
        }
        if self.max_attempts > 10 {
            return Err(ProfileError::invalid("retry.max_attempts should not exceed 10"));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ProfileError::invalid(
                "retry.max_delay_ms must not be below retry.base_delay_ms",
            ));
        }
        Ok(())
    }

    /// Builder method to set the attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Builder method to disable jitter, for deterministic schedules.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }
}

/// Per-step timeouts. Each attempt of a step gets the full budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Bound on one secret store read, in seconds
    pub secret_fetch_secs: u64,
    /// Bound on one crawler submission, in seconds
    pub submission_secs: u64,
    /// Bound on one catalog call, in seconds
    pub catalog_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            secret_fetch_secs: 10,
            submission_secs: 30,
            catalog_secs: 30,
        }
    }
}

impl TimeoutConfig {
    /// Validates timeout parameters.
    ///
    /// # Errors
    /// Returns `ProfileError::Invalid` for zero or excessive timeouts.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for (name, secs) in [
            ("timeouts.secret_fetch_secs", self.secret_fetch_secs),
            ("timeouts.submission_secs", self.submission_secs),
            ("timeouts.catalog_secs", self.catalog_secs),
        ] {
            if secs == 0 {
                return Err(ProfileError::invalid(format!("{} must be greater than 0", name)));
            }
            if secs > 900 {
                return Err(ProfileError::invalid(format!(
                    "{} must not exceed 900 (the function runtime limit)",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Bound on one secret store read
    pub fn secret_fetch(&self) -> Duration {
        Duration::from_secs(self.secret_fetch_secs)
    }

    /// Bound on one crawler submission
    pub fn submission(&self) -> Duration {
        Duration::from_secs(self.submission_secs)
    }

    /// Bound on one catalog call
    pub fn catalog(&self) -> Duration {
        Duration::from_secs(self.catalog_secs)
    }

    /// The longest single step, used as the SDK operation timeout
    pub fn longest(&self) -> Duration {
        Duration::from_secs(
            self.secret_fetch_secs
                .max(self.submission_secs)
                .max(self.catalog_secs),
        )
    }
}
