//! Bounded exponential backoff.
//!
//! Retry `n` (1-based) waits `base_delay × 2^(n-1)`. With the defaults that
//! is 5 s, 10 s, 20 s, 40 s, 80 s, after which the channel gives up until
//! the next explicit connect.

use std::time::Duration;

/// Base delay before the first retry.
pub const DEFAULT_RECONNECT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Retries scheduled before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Reconnection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Maximum number of retries per outage
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { base_delay: DEFAULT_RECONNECT_BASE_DELAY, max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based). Saturates instead of
    /// overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Retry counter for one outage.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl Backoff {
    /// Fresh counter.
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempts: 0 }
    }

    /// Count one more retry and return how long to wait before it, or `None`
    /// if the policy is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.policy.delay_for(self.attempts))
    }

    /// Retries scheduled since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether no retries remain.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    /// Start counting from zero (after a successful connect).
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
