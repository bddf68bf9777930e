//! Reconnect scheduling.

use std::time::Duration;

/// Delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Reconnect attempts made before giving up.
pub const DEFAULT_CEILING: u32 = 5;

/// Exponential backoff with a retry ceiling.
///
/// Attempt `n` (zero-based) waits `base * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    ceiling: u32,
}

impl Backoff {
    pub fn new(base: Duration, ceiling: u32) -> Self {
        Self { base, ceiling }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Whether another reconnect may be scheduled after `attempts` attempts.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.ceiling
    }

    /// Delay before the reconnect following `attempts` attempts.
    pub fn compute_delay(&self, attempts: u32) -> Duration {
        let factor = 2u32.checked_pow(attempts).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_CEILING)
    }
}

/// Reconnect attempts since the last successful open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempts: u32,
    backoff: Backoff,
}

impl RetryState {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            attempts: 0,
            backoff,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn ceiling(&self) -> u32 {
        self.backoff.ceiling()
    }

    /// Delay to wait before the next attempt, or `None` once the ceiling is
    /// reached.
    pub fn next_delay(&self) -> Option<Duration> {
        self.backoff
            .should_retry(self.attempts)
            .then(|| self.backoff.compute_delay(self.attempts))
    }

    /// Count an attempt as it starts.
    pub fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
