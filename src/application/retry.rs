//! Retry with exponential backoff and jitter
//!
//! Every backend request runs through [`RetryPolicy::execute`]:
//! - transient failures (connection refused, timeouts) are retried
//! - the delay grows as `delay * backoff + U(0, jitter)`, capped at `max_delay`
//! - any other error is returned on the spot
//! - attempts are unbounded unless `max_attempts` is set

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::config::RetryConfig;

/// Errors that can tell whether repeating the same request may succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    initial_delay: Duration,
    backoff: f64,
    jitter: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(
        initial_delay: Duration,
        backoff: f64,
        jitter: Duration,
        max_delay: Duration,
        max_attempts: Option<u32>,
    ) -> Self {
        Self {
            initial_delay: initial_delay.min(max_delay),
            backoff: backoff.max(1.0),
            jitter,
            max_delay,
            max_attempts: max_attempts.map(|n| n.max(1)),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let secs = |v: f64| Duration::from_secs_f64(v.max(0.0));
        Self::new(
            secs(config.initial_delay_secs),
            config.backoff,
            secs(config.jitter_secs),
            secs(config.max_delay_secs),
            config.max_attempts,
        )
    }

    /// A policy that retries immediately. Used in tests.
    #[cfg(test)]
    pub fn immediate(max_attempts: Option<u32>) -> Self {
        Self::new(Duration::ZERO, 2.0, Duration::ZERO, Duration::ZERO, max_attempts)
    }

    /// Delay to wait after the next failure, given the one just waited.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let jitter = if self.jitter.is_zero() {
            0.0
        } else {
            rand::thread_rng().gen_range(0.0..=self.jitter.as_secs_f64())
        };
        let secs = current.as_secs_f64() * self.backoff + jitter;
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Runs `operation` until it succeeds, fails with a non-transient error,
    /// or runs out of attempts.
    pub async fn execute<F, Fut, T, E>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let mut delay = self.initial_delay;
        let mut attempt: u32 = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(request = label, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if !error.is_transient() => return Err(error),
                Err(error) => {
                    if self.max_attempts.is_some_and(|max| attempt >= max) {
                        tracing::error!(
                            request = label,
                            attempt,
                            error = %error,
                            "Giving up after repeated network failures"
                        );
                        return Err(error);
                    }

                    tracing::warn!(
                        request = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient network failure, retrying"
                    );

                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    delay = self.next_delay(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum FakeError {
        ConnectionReset,
        NotFound,
    }

    impl Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Transient for FakeError {
        fn is_transient(&self) -> bool {
            matches!(self, FakeError::ConnectionReset)
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let policy = RetryPolicy::immediate(None);
        let calls = AtomicU32::new(0);

        let result = policy
            .execute("products", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 4 {
                        Err(FakeError::ConnectionReset)
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(4));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let policy = RetryPolicy::immediate(None);
        let calls = AtomicU32::new(0);

        let result: Result<(), FakeError> = policy
            .execute("product 7", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FakeError::NotFound) }
            })
            .await;

        assert_eq!(result, Err(FakeError::NotFound));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_max_attempts_caps_retries() {
        let policy = RetryPolicy::immediate(Some(3));
        let calls = AtomicU32::new(0);

        let result: Result<(), FakeError> = policy
            .execute("carts", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FakeError::ConnectionReset) }
            })
            .await;

        assert_eq!(result, Err(FakeError::ConnectionReset));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_delay_growth_and_cap() {
        let policy = RetryPolicy::default();

        let first = policy.next_delay(Duration::ZERO);
        assert!(first <= Duration::from_secs(1));

        let grown = policy.next_delay(Duration::from_secs(10));
        assert!(grown >= Duration::from_secs(20));
        assert!(grown <= Duration::from_secs(21));

        let capped = policy.next_delay(Duration::from_secs(3000));
        assert_eq!(capped, Duration::from_secs(3600));
    }

    #[test]
    fn test_without_jitter_delay_is_exact() {
        let policy = RetryPolicy::new(
            Duration::from_secs(1),
            2.0,
            Duration::ZERO,
            Duration::from_secs(5),
            None,
        );
        assert_eq!(policy.next_delay(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(policy.next_delay(Duration::from_secs(2)), Duration::from_secs(4));
        assert_eq!(policy.next_delay(Duration::from_secs(4)), Duration::from_secs(5));
    }
}
