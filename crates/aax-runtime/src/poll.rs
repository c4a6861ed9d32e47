//! Bounded fixed-delay polling.
//!
//! Used to wait for state the harness does not control (container health,
//! deployment readiness, claim binding) to converge. Attempt-counted with a
//! constant delay: no backoff, no jitter, no cancellation.

use std::time::Duration;

use aax_common::error::{AaxError, Result};

/// Attempt budget and delay for one polled condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    attempts: u32,
    delay: Duration,
}

impl Poller {
    /// Creates a poller making at most `attempts` checks, `delay` apart.
    #[must_use]
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Maximum number of checks.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay between consecutive checks.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Polls `check` with `std::thread::sleep` between attempts.
    ///
    /// See [`Poller::poll_with_sleep`].
    ///
    /// # Errors
    ///
    /// Returns [`AaxError::Timeout`] if the budget is exhausted, or the first
    /// error returned by `check`.
    pub fn poll<F>(&self, condition: &str, check: F) -> Result<u32>
    where
        F: FnMut() -> Result<bool>,
    {
        self.poll_with_sleep(condition, check, std::thread::sleep)
    }

    /// Invokes `check` until it returns `true` or the budget runs out.
    ///
    /// On success returns the 1-based attempt that succeeded; `sleep` has
    /// then been called exactly one time fewer. No sleep follows the final
    /// attempt. An `Err` from `check` stops polling immediately.
    ///
    /// # Errors
    ///
    /// Returns [`AaxError::Config`] for a zero attempt budget,
    /// [`AaxError::Timeout`] after `attempts` unsuccessful checks, or the
    /// first error returned by `check`.
    pub fn poll_with_sleep<F, S>(&self, condition: &str, mut check: F, mut sleep: S) -> Result<u32>
    where
        F: FnMut() -> Result<bool>,
        S: FnMut(Duration),
    {
        if self.attempts == 0 {
            return Err(AaxError::config(format!(
                "poll budget for {condition} must allow at least one attempt"
            )));
        }

        for attempt in 1..=self.attempts {
            if check()? {
                tracing::debug!(condition, attempt, "condition met");
                return Ok(attempt);
            }
            tracing::debug!(condition, attempt, max = self.attempts, "condition not met yet");
            if attempt < self.attempts {
                sleep(self.delay);
            }
        }

        tracing::warn!(condition, attempts = self.attempts, "gave up waiting");
        Err(AaxError::Timeout {
            condition: condition.to_string(),
            attempts: self.attempts,
        })
    }
}
