//! Client-side rate limiting.
//!
//! A leaky bucket with a burst of one: every caller reserves the next free
//! slot under a short lock and then sleeps until that slot outside the lock,
//! so concurrent callers are spaced exactly `interval` apart.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Notion's documented average limit.
pub const DEFAULT_CALLS_PER_SECOND: u32 = 3;

/// Process-wide limiter shared by every remote call.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Limiter allowing `calls` calls per second. Zero disables limiting.
    #[must_use]
    pub fn per_second(calls: u32) -> Self {
        let interval = if calls == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / calls
        };
        Self::with_interval(interval)
    }

    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait for the next permitted call slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = next.filter(|&t| t > now).unwrap_or(now);
            *next = Some(slot + self.interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_second(DEFAULT_CALLS_PER_SECOND)
    }
}
