//! Retry and backoff policy for broker operations and job redelivery.

use std::time::Duration;

use crate::{Result, TRACING_TARGET_CONNECTION};

/// Exponential backoff with a ceiling on attempts and delay.
///
/// Attempt numbers are 1-based: the first retry after attempt 1 waits
/// `initial_backoff`, the next twice as long, and so on up to `max_backoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any delay.
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt ceiling and first delay.
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            ..Self::default()
        }
    }

    /// Policy for retrying job executions: delays double from `base`.
    pub fn jobs(max_attempts: u32, base: Duration) -> Self {
        Self::new(max_attempts, base).with_max_backoff(base.saturating_mul(16))
    }

    /// Set the maximum backoff duration.
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Returns whether another attempt is allowed after `attempt`.
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after the given failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let millis =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let max_millis = self.max_backoff.as_millis() as f64;
        Duration::from_millis(millis.min(max_millis) as u64)
    }

    /// Retry an async operation while it fails with retryable errors.
    pub async fn retry<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && self.can_retry(attempt) => {
                    let backoff = self.backoff(attempt);
                    tracing::debug!(
                        target: TRACING_TARGET_CONNECTION,
                        error = %err,
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis(),
                        "Retrying operation after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::Error;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));

        let capped = policy.with_max_backoff(Duration::from_millis(300));
        assert_eq!(capped.backoff(3), Duration::from_millis(300));
    }

    #[test]
    fn job_policy_starts_at_base_delay() {
        let policy = RetryPolicy::jobs(3, Duration::from_secs(60));
        assert_eq!(policy.backoff(1), Duration::from_secs(60));
        assert_eq!(policy.backoff(2), Duration::from_secs(120));
        assert!(policy.can_retry(2));
        assert!(!policy.can_retry(3));
    }

    #[test]
    fn at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn retries_transient_errors() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .retry(|| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(Error::timeout(Duration::from_secs(1)))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_permanent_errors() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .retry(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Error::invalid_config("bad"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
