//! Fixed-count, fixed-delay retry

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::FetchError;
use crate::config::FetchConfig;

/// How often and how far apart to retry; no jitter, no growth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.attempts, config.delay())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        FetchError::is_retryable(self)
    }
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are spent; the last error is returned
///
/// `call` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut call: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match call(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.is_retryable() => {
                warn!(
                    label,
                    attempt,
                    attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "retry: attempt failed, retrying"
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
            Err(e) => {
                debug!(label, attempt, error = %e, "retry: giving up");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (retryable: {})", self.retryable)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn no_delay(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result: Result<&str, TestError> = retry(&no_delay(3), "test", |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 3 {
                    Err(TestError { retryable: true })
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), TestError> = retry(&no_delay(3), "test", |_| {
            calls.set(calls.get() + 1);
            async { Err(TestError { retryable: true }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = Cell::new(0);
        let result: Result<(), TestError> = retry(&no_delay(5), "test", |_| {
            calls.set(calls.get() + 1);
            async { Err(TestError { retryable: false }) }
        })
        .await;
        assert!(!result.unwrap_err().retryable);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let calls = Cell::new(0);
        let result: Result<u8, TestError> = retry(&no_delay(0), "test", |_| {
            calls.set(calls.get() + 1);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_waits_between_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(20));
        let start = std::time::Instant::now();
        let _: Result<(), TestError> = retry(&policy, "test", |_| async { Err(TestError { retryable: true }) }).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_from_config() {
        let config = FetchConfig {
            attempts: 4,
            delay_ms: 250,
            timeout_ms: 1000,
        };
        assert_eq!(
            RetryPolicy::from_config(&config),
            RetryPolicy::new(4, Duration::from_millis(250))
        );
    }
}
