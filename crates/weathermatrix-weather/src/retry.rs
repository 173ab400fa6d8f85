//! Retry policy for provider refreshes with linear backoff.
//!
//! Retried:
//! - Network errors and timeouts
//! - 5xx server errors, 403, 429
//! - Malformed responses
//!
//! Not retried:
//! - 400, 401, 404 client errors

use std::time::Duration;

use crate::error::ProviderError;

/// Default retry configuration
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of fetch attempts per refresh
    pub max_retries: u32,
    /// Backoff base unit; the wait after attempt `n` (0-based) is `(n + 1) * retry_delay`
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_secs_f64(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    /// Build from a delay in (possibly fractional) seconds.
    /// Negative or non-finite delays are treated as zero.
    pub fn from_secs_f64(max_retries: u32, retry_delay_secs: f64) -> Self {
        let delay = if retry_delay_secs.is_finite() && retry_delay_secs > 0.0 {
            Duration::try_from_secs_f64(retry_delay_secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self::new(max_retries, delay)
    }

    /// Calculate the wait after the given (0-based) failed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt.saturating_add(1))
    }

    /// Whether another attempt is allowed after the given (0-based) attempt
    pub fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_retries
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Should retry the request
    Retry,
    /// Should not retry - permanent failure
    NoRetry,
}

/// Check if a provider error is worth another attempt
pub fn classify(error: &ProviderError) -> RetryDecision {
    if error.is_client_error() {
        tracing::debug!("Client error ({}), not retryable", error);
        RetryDecision::NoRetry
    } else {
        tracing::debug!("Transient error ({}), will retry", error);
        RetryDecision::Retry
    }
}
