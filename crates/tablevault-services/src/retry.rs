//! Explicit retry policy for outbound calls.
//!
//! Collaborator implementations wrap each call site in a policy instead of
//! decorating methods: bounded attempts, exponential backoff with a cap,
//! and an error-kind predicate (only throttling retries).

use std::time::Duration;

use tracing::warn;

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Run `op`, retrying throttling failures until the attempt budget is
    /// spent. Any other failure returns immediately.
    pub fn run<T>(&self, mut op: impl FnMut() -> ServiceResult<T>) -> ServiceResult<T> {
        let mut delay = self.base_delay;
        let mut attempt = 1;

        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_throttling() && attempt < self.max_attempts => {
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "throttled, backing off");
                    std::thread::sleep(delay);
                    delay = (delay * 2).min(self.max_delay);
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

    #[test]
    fn returns_first_success() {
        let calls = Cell::new(0);
        let result: ServiceResult<u32> = RetryPolicy::immediate(5).run(|| {
            calls.set(calls.get() + 1);
            Ok(7)
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retries_throttling_until_success() {
        let calls = Cell::new(0);
        let result = RetryPolicy::immediate(5).run(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(ServiceError::Throttling("slow down".to_string()))
            } else {
                Ok("done")
            }
        });
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn exhausts_the_attempt_budget() {
        let calls = Cell::new(0);
        let result: ServiceResult<()> = RetryPolicy::immediate(4).run(|| {
            calls.set(calls.get() + 1);
            Err(ServiceError::Throttling("always".to_string()))
        });
        assert!(result.unwrap_err().is_throttling());
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn non_throttling_errors_fail_fast() {
        let calls = Cell::new(0);
        let result: ServiceResult<()> = RetryPolicy::immediate(5).run(|| {
            calls.set(calls.get() + 1);
            Err(ServiceError::NotFound("missing".to_string()))
        });
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.get(), 1);
    }
}
