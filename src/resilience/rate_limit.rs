//! Sliding-window rate limiting.
//!
//! Admission timestamps older than the window are dropped on every call; when
//! the window is full the caller sleeps until the oldest timestamp expires.
//! The limiter is single-writer: `throttle` takes `&mut self`, so sharing one
//! across tasks requires external serialization (e.g. a `tokio::sync::Mutex`).

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Gate allowing at most `max_requests` admissions per sliding `window`.
#[derive(Debug)]
pub struct RateLimiter {
    admitted: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter. A `max_requests` of zero is treated as one.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            admitted: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_millis(config.window_ms))
    }

    /// Wait until the window has capacity, then record the admission.
    ///
    /// Never fails; only delays.
    pub async fn throttle(&mut self) {
        let mut waited = false;

        loop {
            let now = Instant::now();
            self.prune(now);

            if self.admitted.len() < self.max_requests {
                self.admitted.push_back(now);
                return;
            }

            let Some(&oldest) = self.admitted.front() else {
                continue;
            };
            let wait = self.window.saturating_sub(now.duration_since(oldest));

            if !waited {
                metrics::record_rate_limit_wait();
                waited = true;
            }
            tracing::debug!(
                wait = ?wait,
                max_requests = self.max_requests,
                "Rate limit window full, waiting"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Admissions currently inside the window.
    pub fn in_window(&mut self) -> usize {
        self.prune(Instant::now());
        self.admitted.len()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.admitted.front() {
            if now.duration_since(oldest) < self.window {
                break;
            }
            self.admitted.pop_front();
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
