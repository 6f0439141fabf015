/// Retry policy for Wordstat requests.
///
/// The decision of what to do after a failed attempt is a pure function of the
/// attempt number and the error kind, so it can be tested without a network.
/// Backoff is linear: the wait after attempt `n` is `base_delay * n`.
use std::time::Duration;

use crate::error::ErrorKind;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry { wait: Duration },
    GiveUp,
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
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Decide what follows the failed attempt number `attempt` (1-based).
    pub fn next_action(&self, attempt: u32, kind: ErrorKind) -> RetryAction {
        if kind == ErrorKind::Fatal || attempt >= self.max_attempts.max(1) {
            return RetryAction::GiveUp;
        }
        RetryAction::Retry {
            wait: backoff_delay(self.base_delay, attempt),
        }
    }
}

pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}
