//! Retry policy for idempotent API reads.
//!
//! Only `GET` requests go through a policy. Order creation and coupon
//! validation are sent exactly once.

use crate::ApiError;
use std::time::Duration;

/// Delay between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Retry immediately.
    None,
    /// Fixed delay between retries.
    Fixed(Duration),
    /// `base * 2^attempt`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(delay) => *delay,
            Self::Exponential { base, max } => base
                .checked_mul(2u32.saturating_pow(attempt))
                .map_or(*max, |delay| delay.min(*max)),
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(200),
            max: Duration::from_secs(2),
        }
    }
}

/// How often and when to retry a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::default(),
        }
    }

    /// Create a policy with no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffStrategy::None,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether `error` on attempt `attempt` (0-indexed) warrants another try.
    ///
    /// Timeouts, connection failures, 5xx, 408 and 429 are retried.
    pub fn should_retry(&self, error: &ApiError, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        if error.is_timeout() || error.is_connect() {
            return true;
        }
        matches!(error.status(), Some(408 | 429 | 500..=599))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}
