//! Retry policy for connection errors.
//!
//! A fixed budget of re-attempts with a fixed delay between them.  There is no
//! back-off growth and no jitter.  Timeouts never reach this module: they are
//! terminal.

use std::time::Duration;

/// Delay between a failed attempt and the next one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Result of consulting the policy after a connection error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-open the transport after `delay`.
    Retry { delay: Duration },
    /// Budget exhausted; report the error.
    GiveUp,
}

/// Pure decision: `Some(remaining - 1)` when a retry is allowed.
pub fn next_remaining(remaining: u32) -> Option<u32> {
    remaining.checked_sub(1)
}

/// Retry budget carried across the attempts of one logical request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    remaining: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            remaining: max_retries,
            delay,
        }
    }

    /// Retries still available.  Only ever decreases.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consume one retry if any remain.
    pub fn on_error(&mut self) -> RetryDecision {
        match next_remaining(self.remaining) {
            Some(left) => {
                self.remaining = left;
                RetryDecision::Retry { delay: self.delay }
            }
            None => RetryDecision::GiveUp,
        }
    }
}
