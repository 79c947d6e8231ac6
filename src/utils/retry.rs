//! Fixed-backoff retry combinator.
//!
//! Business code decides *what* is retryable through a predicate; this module
//! only decides *how often* and *how long to wait*.

use std::time::Duration;

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A policy that never retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Run `op` until it succeeds, returns a non-retryable error, or the attempt
/// budget is spent. `op` receives the 1-based attempt number.
///
/// The last error is returned unchanged when the budget runs out.
pub fn retry<T, E, F, P>(policy: &RetryPolicy, label: &str, is_retryable: P, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                log_status!(
                    "retry",
                    "{} failed (attempt {}/{}): {}; retrying in {}s",
                    label,
                    attempt,
                    max_attempts,
                    err,
                    policy.delay.as_secs()
                );
                if !policy.delay.is_zero() {
                    std::thread::sleep(policy.delay);
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn always_failing_op_runs_exactly_max_attempts() {
        let mut calls = 0;
        let result: Result<(), String> = retry(&instant(3), "probe", |_| true, |_| {
            calls += 1;
            Err("connection refused".to_string())
        });
        assert_eq!(calls, 3);
        assert_eq!(result.unwrap_err(), "connection refused");
    }

    #[test]
    fn stops_after_first_success() {
        let mut calls = 0;
        let result: Result<u32, String> = retry(&instant(3), "probe", |_| true, |attempt| {
            calls += 1;
            if attempt == 2 {
                Ok(attempt)
            } else {
                Err("timeout".to_string())
            }
        });
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 2);
    }

    #[test]
    fn non_retryable_error_returns_immediately() {
        let mut calls = 0;
        let result: Result<(), String> = retry(
            &instant(5),
            "probe",
            |err: &String| err.contains("timeout"),
            |_| {
                calls += 1;
                Err("exit status 1".to_string())
            },
        );
        assert_eq!(calls, 1);
        assert!(result.is_err());
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let mut calls = 0;
        let _: Result<(), String> = retry(&instant(0), "probe", |_| true, |_| {
            calls += 1;
            Err("x".to_string())
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn default_policy_matches_remote_session_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }
}
