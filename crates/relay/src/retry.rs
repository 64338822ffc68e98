//! Bounded retry of failed finalizations.

use state::RetryState;
use std::time::{Duration, Instant};
use tokio_retry::strategy::ExponentialBackoff;

/// How often and how patiently a failed message is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before a message is dead-lettered
    pub max_attempts: u32,
    /// Delay after the first failure; doubles per further failure
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `failures + 1`, given `failures >= 1` failed attempts.
    pub fn delay(&self, failures: u32) -> Duration {
        // from_millis(2) doubles per step; the factor scales the first step to base_delay
        let factor = (self.base_delay.as_millis() as u64 / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_delay)
            .nth(failures.saturating_sub(1) as usize)
            .unwrap_or(self.max_delay)
    }

    /// Record a failed attempt. Returns `true` if the retry budget is spent.
    pub fn record_failure(&self, retry: &mut RetryState, now: Instant) -> bool {
        let delay = self.delay(retry.attempts.saturating_add(1));
        retry.record_failure(now, delay);
        retry.attempts >= self.max_attempts
    }
}
