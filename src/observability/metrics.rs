//! Metrics collection.
//!
//! # Metrics
//! - `api_requests_total` (counter): network attempts by method, status
//! - `api_token_refresh_total` (counter): refresh attempts by outcome
//! - `api_session_expired_total` (counter): unrecoverable 401s
//! - `retry_attempts_total` (counter): retries scheduled by the retry helper
//! - `rate_limit_waits_total` (counter): throttle calls that had to wait
//! - `cache_lookups_total` (counter): TTL cache lookups by result

use metrics::counter;

/// Record one network attempt made by the API client.
pub fn record_request(method: &str, status: u16) {
    counter!(
        "api_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record the outcome of a credential refresh ("success", "failure", "missing").
pub fn record_token_refresh(outcome: &'static str) {
    counter!("api_token_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a session that could not be recovered.
pub fn record_session_expired() {
    counter!("api_session_expired_total").increment(1);
}

/// Record a scheduled retry.
pub fn record_retry(backoff: &'static str) {
    counter!("retry_attempts_total", "backoff" => backoff).increment(1);
}

/// Record a throttle call that had to wait for window capacity.
pub fn record_rate_limit_wait() {
    counter!("rate_limit_waits_total").increment(1);
}

/// Record a cache lookup ("hit", "miss", "expired").
pub fn record_cache_lookup(result: &'static str) {
    counter!("cache_lookups_total", "result" => result).increment(1);
}
