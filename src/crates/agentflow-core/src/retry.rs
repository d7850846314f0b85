//! Retry with exponential backoff
//!
//! [`RetryPolicy`] describes how many attempts to make and how long to wait
//! between them; [`with_retry`] runs a fallible async operation under a
//! policy. Delay for attempt `n` (zero-based) is
//! `initial_interval * backoff_factor^n`, capped at `max_interval`, with
//! optional jitter in the 0.5x..1.5x range.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Backoff configuration for retried operations
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: usize,

    /// Delay before the first retry, in seconds
    pub initial_interval: f64,

    /// Multiplier applied per attempt
    pub backoff_factor: f64,

    /// Upper bound on any single delay, in seconds
    pub max_interval: f64,

    /// Randomize each delay by 0.5x..1.5x
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_interval: 0.5,
            backoff_factor: 2.0,
            max_interval: 128.0,
            jitter: true,
        }
    }

    pub fn with_initial_interval(mut self, seconds: f64) -> Self {
        self.initial_interval = seconds;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_max_interval(mut self, seconds: f64) -> Self {
        self.max_interval = seconds;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether another attempt is allowed after `attempts_made` attempts
    pub fn should_retry(&self, attempts_made: usize) -> bool {
        attempts_made < self.max_attempts.max(1)
    }

    /// Delay before the retry following zero-based attempt `attempt`
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        let exponent = self.backoff_factor.powi(attempt.min(i32::MAX as usize) as i32);
        let mut seconds = (self.initial_interval * exponent).min(self.max_interval);
        if self.jitter {
            seconds *= rand::thread_rng().gen_range(0.5..=1.5);
        }
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

/// Run `operation` until it succeeds or the policy's attempts are exhausted,
/// returning the last error
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut made = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                made += 1;
                if made >= attempts {
                    return Err(err);
                }
                let delay = policy.calculate_delay(made - 1);
                tracing::debug!(
                    attempt = made,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_delay_grows_exponentially() {
        let policy = RetryPolicy::new(5)
            .with_initial_interval(1.0)
            .with_jitter(false);
        assert_eq!(policy.calculate_delay(0), Duration::from_secs(1));
        assert_eq!(policy.calculate_delay(1), Duration::from_secs(2));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_capped_at_max_interval() {
        let policy = RetryPolicy::new(20)
            .with_initial_interval(1.0)
            .with_max_interval(8.0)
            .with_jitter(false);
        assert_eq!(policy.calculate_delay(10), Duration::from_secs(8));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = RetryPolicy::new(3).with_initial_interval(2.0);
        for _ in 0..100 {
            let delay = policy.calculate_delay(0).as_secs_f64();
            assert!((1.0..=3.0).contains(&delay), "delay out of range: {delay}");
        }
    }

    #[test]
    fn test_should_retry_boundary() {
        let policy = RetryPolicy::new(3);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_eventually_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new(5)
            .with_initial_interval(0.1)
            .with_jitter(false);

        let counter = calls.clone();
        let result: Result<&str, String> = with_retry(&policy, move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("not yet".to_string())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_returns_last_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new(3)
            .with_initial_interval(0.1)
            .with_jitter(false);

        let counter = calls.clone();
        let result: Result<(), String> = with_retry(&policy, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("failure {n}")) }
        })
        .await;

        assert_eq!(result.unwrap_err(), "failure 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_waits_between_attempts() {
        let start = tokio::time::Instant::now();
        let policy = RetryPolicy::new(3)
            .with_initial_interval(1.0)
            .with_jitter(false);

        let _: Result<(), &str> = with_retry(&policy, || async { Err("no") }).await;

        // 1s after the first failure, 2s after the second
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
