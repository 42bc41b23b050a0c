//! Retry policy for engine attempts on one segment.

use crate::pipeline::types::FailureReason;
use std::time::Duration;
use tokio::time::sleep;

/// Attempt budget and backoff for engine calls on one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
        }
    }

    /// Wait `base_delay * 2^(attempt-1)` between attempts.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempt` is the 1-based number of the attempt that just failed.
    pub fn should_retry(&self, attempt: u32, reason: FailureReason) -> bool {
        reason.is_retryable() && attempt < self.max_attempts
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(multiplier)
    }

    pub async fn wait_before_retry(&self, attempt: u32) {
        let delay = self.delay_for(attempt);
        if delay.is_zero() {
            return;
        }
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "waiting before retry"
        );
        sleep(delay).await;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::defaults::MAX_ATTEMPTS)
    }
}
