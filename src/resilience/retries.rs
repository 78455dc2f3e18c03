//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a failed async operation up to `max_retries` more times
//! - Wait `Backoff::delay` between attempts
//! - Give up immediately on client errors (status 400..500) and on any
//!   failure whose `Retryable::is_retryable` says another attempt is pointless
//!
//! # Design Decisions
//! - The last observed failure is returned unchanged once retries run out
//! - Failures without a status (network, timeout) are always retryable

use std::future::Future;
use std::time::Duration;

use crate::config::RetrySettings;
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;

/// A failure that may carry an HTTP-like status.
pub trait Retryable {
    /// Status attached to the failure, if any.
    fn status_code(&self) -> Option<u16>;

    /// Client errors are never retried.
    fn is_client_error(&self) -> bool {
        matches!(self.status_code(), Some(400..=499))
    }

    /// Whether another attempt could change the outcome.
    fn is_retryable(&self) -> bool {
        !self.is_client_error()
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Base delay fed to the backoff strategy.
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(1000),
            backoff: Backoff::Exponential,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            delay: Duration::from_millis(settings.delay_ms),
            backoff: settings.backoff,
        }
    }
}

/// Run `operation`, retrying per `config`.
pub async fn retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(retries = attempt, "Operation succeeded after retries");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => {
                tracing::debug!(
                    status = ?e.status_code(),
                    error = %e,
                    "Failure is not retryable"
                );
                return Err(e);
            }
            Err(e) if attempt >= config.max_retries => {
                tracing::warn!(attempts = attempt + 1, error = %e, "Retries exhausted");
                return Err(e);
            }
            Err(e) => {
                let delay = config.backoff.delay(config.delay, attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    delay = ?delay,
                    error = %e,
                    "Operation failed, retrying"
                );
                metrics::record_retry(config.backoff.as_str());
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[derive(Debug)]
    struct Failure(Option<u16>);

    impl std::fmt::Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "failure {:?}", self.0)
        }
    }

    impl Retryable for Failure {
        fn status_code(&self) -> Option<u16> {
            self.0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_server_errors() {
        let calls = Cell::new(0u32);
        let config = RetryConfig::default();
        let start = Instant::now();

        let result = retry(&config, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n <= 2 {
                    Err(Failure(Some(503)))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
        // delay×1 + delay×2
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(3010), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let calls = Cell::new(0u32);
        let start = Instant::now();

        let result: Result<(), _> = retry(&RetryConfig::default(), || {
            calls.set(calls.get() + 1);
            async { Err(Failure(Some(404))) }
        })
        .await;

        assert_eq!(result.unwrap_err().0, Some(404));
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_failure() {
        let calls = Cell::new(0u32);
        let config = RetryConfig {
            max_retries: 2,
            delay: Duration::from_millis(100),
            backoff: Backoff::Linear,
        };
        let start = Instant::now();

        let result: Result<(), _> = retry(&config, || {
            calls.set(calls.get() + 1);
            let status = if calls.get() == 3 { 502 } else { 500 };
            async move { Err(Failure(Some(status))) }
        })
        .await;

        assert_eq!(result.unwrap_err().0, Some(502));
        assert_eq!(calls.get(), 3);
        // 100×1 + 100×2
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(310));
    }

    #[tokio::test(start_paused = true)]
    async fn test_statusless_failure_is_retried() {
        let calls = Cell::new(0u32);
        let config = RetryConfig {
            max_retries: 1,
            ..RetryConfig::default()
        };

        let result = retry(&config, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { if n == 1 { Err(Failure(None)) } else { Ok(n) } }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[derive(Debug)]
    struct AlreadyApplied;

    impl std::fmt::Display for AlreadyApplied {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "applied but unreadable")
        }
    }

    impl Retryable for AlreadyApplied {
        fn status_code(&self) -> Option<u16> {
            Some(200)
        }

        fn is_retryable(&self) -> bool {
            false
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_failure_stops_immediately() {
        let calls = Cell::new(0u32);

        let result: Result<(), _> = retry(&RetryConfig::default(), || {
            calls.set(calls.get() + 1);
            async { Err(AlreadyApplied) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_from_settings() {
        let config = RetryConfig::from(&RetrySettings::default());
        assert_eq!(config, RetryConfig::default());
    }
}
