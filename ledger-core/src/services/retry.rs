//! Re-running units of work that lost a write race

use std::thread;

use crate::config::RetryPolicy;
use crate::domain::result::{Error, Result};

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts
///
/// Only [`Error::is_retryable`] failures (write conflicts and request-id
/// collisions) are retried. When attempts run out the last conflict is
/// reported as `Error::Internal`.
pub(crate) fn run_with_retry<T>(
    policy: &RetryPolicy,
    operation: &str,
    mut attempt: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut tries = 0u32;
    loop {
        tries += 1;
        match attempt() {
            Err(e) if e.is_retryable() && tries < policy.max_attempts => {
                let delay = policy.delay_for(tries);
                tracing::debug!(
                    operation,
                    attempt = tries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Unit of work conflicted, retrying"
                );
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(operation, attempts = tries, error = %e, "Giving up after conflicts");
                return Err(Error::internal(format!(
                    "{} did not complete after {} conflicting attempts: {}",
                    operation, tries, e
                )));
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::ErrorKind;

    #[test]
    fn test_retries_until_success() {
        let mut calls = 0;
        let result = run_with_retry(&RetryPolicy::immediate(5), "test", || {
            calls += 1;
            if calls < 3 {
                Err(Error::conflict("busy"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_exhausted_retries_become_internal() {
        let mut calls = 0;
        let result: Result<()> = run_with_retry(&RetryPolicy::immediate(4), "test", || {
            calls += 1;
            Err(Error::conflict("busy"))
        });
        assert_eq!(calls, 4);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_business_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<()> = run_with_retry(&RetryPolicy::immediate(4), "test", || {
            calls += 1;
            Err(Error::invalid("insufficient funds"))
        });
        assert_eq!(calls, 1);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidRequest);
    }
}
