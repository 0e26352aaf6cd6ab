//! Acquisition retry policy

use std::time::Duration;

use rand::Rng;

/// Bounded attempts with a uniformly random pause in `[0, max_delay]` between them,
/// so competing clients do not retry in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            max_delay,
        }
    }

    /// Total attempts, including the first
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Pause before the next attempt
    pub fn jittered_delay(&self) -> Duration {
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}
