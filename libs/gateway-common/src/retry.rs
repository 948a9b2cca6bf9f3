//! Retrying execution of outbound calls with exponential backoff.
//!
//! Wraps an arbitrary async operation producing `Result<T, UpstreamError>`.
//! Retryability is decided by [`UpstreamError::is_retryable`]; non-retryable
//! errors fail on first occurrence. Every attempt, success or failure, emits
//! a structured log entry.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::UpstreamError;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempt budget, including the first attempt (must be >= 1)
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each further retry
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// Set the total attempt budget.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }
}

/// Retry policy for executing outbound calls with automatic retries.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Delay to wait before the given attempt number.
    ///
    /// Attempt numbers start at 1; the first attempt has no delay. Attempt
    /// `n` (n >= 2) waits `base_delay * 2^(n-2)`, so the first retry waits
    /// the base delay, the second twice that, and so on.
    #[must_use]
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        self.config.base_delay.saturating_mul(factor)
    }

    /// Total attempt budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Execute an outbound call, retrying retryable failures.
    ///
    /// `method` and `url` are used only for logging.
    ///
    /// # Errors
    ///
    /// Returns the error itself when it is non-retryable, or
    /// [`UpstreamError::RetryExhausted`] wrapping the last error once the
    /// attempt budget is consumed.
    pub async fn execute<F, Fut, T>(
        &self,
        method: &str,
        url: &str,
        mut operation: F,
    ) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, UpstreamError>>,
    {
        let budget = self.config.max_attempts.max(1);
        let mut attempt = 1u32;
        loop {
            let started = Instant::now();
            match operation().await {
                Ok(value) => {
                    debug!(
                        method,
                        url,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "upstream call succeeded"
                    );
                    return Ok(value);
                }
                Err(error) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    if !error.is_retryable() {
                        warn!(
                            method,
                            url,
                            attempt,
                            error = %error,
                            elapsed_ms,
                            "upstream call failed, not retryable"
                        );
                        return Err(error);
                    }
                    if attempt >= budget {
                        warn!(
                            method,
                            url,
                            attempt,
                            error = %error,
                            elapsed_ms,
                            "upstream call failed, attempt budget exhausted"
                        );
                        return Err(UpstreamError::RetryExhausted {
                            attempts: attempt,
                            source: Box::new(error),
                        });
                    }
                    let delay = self.delay_before_attempt(attempt + 1);
                    warn!(
                        method,
                        url,
                        attempt,
                        error = %error,
                        elapsed_ms,
                        retry_in_ms = delay.as_millis() as u64,
                        "upstream call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
