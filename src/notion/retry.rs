//! Retry with exponential backoff.
//!
//! One [`RetryPolicy`] value governs every remote call in a run. Each attempt
//! first waits on the shared [`RateLimiter`]; transient failures are retried
//! after `base_delay * 2^(attempt - 1)` (capped at `max_delay`, plus jitter),
//! or after the server's `Retry-After` when that is longer.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::rate_limit::RateLimiter;
use super::store::{Operation, StoreError, StoreResult};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const INITIAL_BACKOFF_MS: u64 = 500;
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Backoff settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Extra random delay as a fraction of the computed delay (0.0..=1.0).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Whether a failure on attempt `attempt` (1-based) should be retried.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, error: &StoreError) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }

    /// Delay before the attempt following failed attempt `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &StoreError) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1 << exponent).min(self.max_delay);
        let jittered = backoff.mul_f64(1.0 + self.jitter.clamp(0.0, 1.0) * unit_random());
        error.retry_after().map_or(jittered, |server| server.max(jittered))
    }

    /// Run `call` under the rate limiter, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last error once it is persistent or attempts run out.
    pub async fn run<T, F, Fut>(
        &self,
        limiter: &RateLimiter,
        operation: Operation,
        mut call: F,
    ) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 1;
        loop {
            limiter.acquire().await;
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(attempt, &error) => {
                    let delay = self.delay_for(attempt, &error);
                    warn!(
                        %operation,
                        attempt,
                        ?delay,
                        error = %error,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    debug!(%operation, attempt, error = %error, "Giving up");
                    return Err(error);
                }
            }
        }
    }
}

/// Uniform value in `[0, 1)` from the low 53 random bits of a v4 UUID.
#[allow(clippy::cast_precision_loss)]
fn unit_random() -> f64 {
    let bits = uuid::Uuid::new_v4().as_u128() & ((1u128 << 53) - 1);
    bits as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = no_jitter();
        let err = StoreError::Transport("timeout".into());
        assert_eq!(policy.delay_for(1, &err), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2, &err), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3, &err), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(20, &err), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[test]
    fn test_retry_after_wins_when_longer() {
        let policy = no_jitter();
        let err = StoreError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(policy.delay_for(1, &err), Duration::from_secs(7));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = RetryPolicy::default();
        let err = StoreError::Transport("reset".into());
        for _ in 0..50 {
            let delay = policy.delay_for(1, &err);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(550));
        }
    }

    #[test]
    fn test_persistent_errors_not_retried() {
        let policy = RetryPolicy::default();
        let rejected = StoreError::from_status(400, "validation_error", "bad".into(), None);
        assert!(!policy.should_retry(1, &rejected));
        assert!(!policy.should_retry(5, &StoreError::Transport("x".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_until_success() {
        let policy = no_jitter();
        let limiter = RateLimiter::per_second(0);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = policy
            .run(&limiter, Operation::CreatePage, move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Server {
                        status: 502,
                        message: "bad gateway".into(),
                    })
                } else {
                    Ok("page-1")
                }
            })
            .await;

        assert_eq!(result, Ok("page-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_at_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..no_jitter()
        };
        let limiter = RateLimiter::per_second(0);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: StoreResult<()> = policy
            .run(&limiter, Operation::AppendBlocks, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Transport("timeout".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_does_not_retry_rejections() {
        let policy = no_jitter();
        let limiter = RateLimiter::per_second(0);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: StoreResult<()> = policy
            .run(&limiter, Operation::DeletePage, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::NotFound("page".into()))
            })
            .await;

        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
