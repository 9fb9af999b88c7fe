//! Retry policy for provider requests.
//!
//! Transient failures are retried with linear backoff: the wait after attempt
//! `n` is `n * base_delay`.

use crate::config::RetrySettings;
use crate::error::{EnrichError, EnrichResult};
use std::thread;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
        }
    }

    /// Policy that never waits between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
        }
    }

    /// Wait after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Returns true if the error is transient and attempts remain.
    pub fn should_retry(&self, error: &EnrichError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or
    /// attempts run out. `op` receives the 1-based attempt number.
    pub fn run<T>(&self, label: &str, mut op: impl FnMut(u32) -> EnrichResult<T>) -> EnrichResult<T> {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&err, attempt) => {
                    let wait = self.backoff(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        label, attempt, self.max_attempts, err, wait
                    );
                    if !wait.is_zero() {
                        thread::sleep(wait);
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetrySettings::default())
    }
}
