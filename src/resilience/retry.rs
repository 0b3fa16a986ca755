//! Exponential-backoff retry for generation exchanges.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// One execution of the wrapped operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based attempt number.
    pub index: u32,
    /// Time slept before this attempt started (zero for the first).
    pub delay: Duration,
}

impl RetryAttempt {
    pub fn first() -> Self {
        Self {
            index: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.index > 1
    }
}

/// Pure exponential backoff, no jitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before the `retry`-th retry (1-based): `base * 2^(retry - 1)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `operation` until it succeeds, fails fatally, or attempts run out.
    ///
    /// Fatal errors (see [`Error::is_retryable`]) are returned after the attempt that
    /// produced them. When attempts run out, the last error is returned.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(RetryAttempt) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = RetryAttempt::first();
        loop {
            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_retryable() {
                debug!(attempt = attempt.index, kind = %err.kind(), "fatal error, not retrying");
                return Err(err);
            }
            if attempt.index >= self.max_attempts {
                warn!(
                    attempts = attempt.index,
                    error = %err,
                    "retry budget exhausted"
                );
                return Err(err);
            }

            let delay = self.backoff(attempt.index);
            warn!(
                attempt = attempt.index,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retryable failure, backing off"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt = RetryAttempt {
                index: attempt.index + 1,
                delay,
            };
        }
    }
}

/// Convenience wrapper over [`RetryPolicy::execute`].
pub async fn execute_with_retry<T, F, Fut>(
    operation: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T>
where
    F: FnMut(RetryAttempt) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    RetryPolicy::new(max_attempts, base_delay)
        .execute(operation)
        .await
}

/// Classify without running anything; exposed for callers that retry at a higher level.
pub fn is_retryable(err: &Error) -> bool {
    err.is_retryable()
}
