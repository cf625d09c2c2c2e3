// Bounded exponential backoff for single HTTP exchanges.
//
// The default policy makes exactly one attempt. Raising `max_retries` in the
// config lets transient failures (network errors, 5xx, 429) be retried.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RequestFailure;

/// Default initial backoff delay in milliseconds.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 200;
/// Default maximum backoff delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Extra attempts after the first one.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            max_retries: 0,
        }
    }
}

impl RetryPolicy {
    /// Exponential delay before retry number `attempt` (0-based), capped at
    /// `max_delay_ms`, with a small deterministic +/-10% jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self
            .initial_delay_ms
            .saturating_mul(1u64 << attempt.min(31));
        let capped = base.min(self.max_delay_ms);
        let jitter_range = capped / 10;
        if jitter_range == 0 {
            return Duration::from_millis(capped);
        }
        let jitter = (attempt as u64 * 7 + 13) % (jitter_range * 2 + 1);
        Duration::from_millis(capped - jitter_range + jitter)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent. `label` only feeds the log line.
    pub fn run<T, F>(&self, label: &str, mut operation: F) -> Result<T, RequestFailure>
    where
        F: FnMut() -> Result<T, RequestFailure>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label,
                        attempt + 1,
                        self.max_retries + 1,
                        err,
                        delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn instant(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            max_retries,
        }
    }

    fn unavailable() -> RequestFailure {
        RequestFailure::Status {
            status: 503,
            body: "busy".into(),
        }
    }

    #[test]
    fn defaults_make_a_single_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 0);
        let calls = Cell::new(0);
        let result: Result<(), _> = policy.run("sign", || {
            calls.set(calls.get() + 1);
            Err(unavailable())
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn delay_grows_exponentially_within_jitter() {
        let policy = RetryPolicy::default();
        let d0 = policy.delay(0).as_millis();
        assert!((180..=220).contains(&d0), "attempt 0: got {}", d0);
        let d1 = policy.delay(1).as_millis();
        assert!((360..=440).contains(&d1), "attempt 1: got {}", d1);
        let d5 = policy.delay(5).as_millis();
        assert!((5760..=7040).contains(&d5), "attempt 5: got {}", d5);
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::default();
        for attempt in [10, 15, 31, 40] {
            let d = policy.delay(attempt).as_millis();
            assert!((27_000..=33_000).contains(&d), "attempt {}: got {}", attempt, d);
        }
    }

    #[test]
    fn transient_failures_are_retried_until_success() {
        let calls = Cell::new(0);
        let result = instant(3).run("register", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(RequestFailure::Network("reset".into()))
            } else {
                Ok("done")
            }
        });
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn retry_budget_is_bounded() {
        let calls = Cell::new(0);
        let result: Result<(), _> = instant(2).run("confirm", || {
            calls.set(calls.get() + 1);
            Err(unavailable())
        });
        assert_eq!(result.unwrap_err().status(), Some(503));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn client_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = instant(5).run("sign", || {
            calls.set(calls.get() + 1);
            Err(RequestFailure::Status {
                status: 404,
                body: "no such upload".into(),
            })
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
