//! Retry policy with exponential backoff over classified GitHub failures.
//!
//! Only rate limits, server errors and transport failures are retried; every
//! other [`GitHubError`] is returned on the first attempt. After the n-th
//! retryable failure the policy sleeps `base_delay * 2^(n-1)` before trying
//! again or, once the attempts are spent, before surfacing the last error.

use std::future::Future;
use std::time::Duration;

use crate::github::GitHubError;

/// Attempts made per logical call unless configured otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay after the first failed attempt unless configured otherwise.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);

/// Retry configuration for one class of upstream calls.
///
/// Bookkeeping lives inside each [`RetryPolicy::run`] call, so one policy can
/// drive any number of concurrent call chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. At least one attempt is always made.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Total attempts per call, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff applied after the given 1-based failed attempt.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use pullgate::retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.delay_for(1), Duration::from_millis(1_000));
    /// assert_eq!(policy.delay_for(3), Duration::from_millis(4_000));
    /// ```
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        2_u32
            .checked_pow(exponent)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or exhausts the configured attempts.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last retryable error once
    /// every attempt has failed.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, GitHubError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitHubError>>,
    {
        let mut attempt = 1;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_retryable() => return Err(error),
                Err(error) => error,
            };

            let delay = self.delay_for(attempt);
            tracing::debug!(
                "{operation_name} failed (attempt {attempt}/{max}), backing off {delay:?}: {error}",
                max = self.max_attempts
            );
            tokio::time::sleep(delay).await;

            if attempt >= self.max_attempts {
                tracing::warn!("{operation_name} gave up after {attempt} attempts: {error}");
                return Err(error);
            }
            attempt += 1;
        }
    }
}
