//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::resilience::backoff::Backoff;

/// Environment variable holding the API base address.
pub const API_URL_ENV: &str = "NEXT_PUBLIC_API_URL";

/// Base address used when neither the file nor the environment sets one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Root configuration for the API client and its utilities.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Base address and per-request timeout.
    pub api: ApiConfig,

    /// Where the credential pair is persisted.
    pub credentials: CredentialConfig,

    /// Defaults for the retry helper.
    pub retries: RetrySettings,

    /// Defaults for the sliding-window rate limiter.
    pub rate_limit: RateLimitConfig,

    /// Defaults for the TTL cache.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ClientConfig {
    /// Config pointing at `base_url` with every other field defaulted.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.api.base_url = base_url.into();
        config
    }

    /// Default per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }
}

/// Outbound request settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base address every relative path is joined to.
    pub base_url: String,

    /// Request timeout in milliseconds, applied per network attempt.
    pub timeout_ms: u64,

    /// Path of the credential refresh endpoint, relative to `base_url`.
    pub refresh_path: String,

    /// Directory downloaded files are written into.
    pub download_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 10_000,
            refresh_path: "/auth/refresh".to_string(),
            download_dir: PathBuf::from("."),
        }
    }
}

/// Credential persistence.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// JSON file holding the credential pair. `None` keeps tokens in memory.
    pub store_path: Option<PathBuf>,
}

/// Retry helper defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Additional attempts after the first failure.
    pub max_retries: u32,

    /// Base delay in milliseconds.
    pub delay_ms: u64,

    /// Delay growth between attempts.
    pub backoff: Backoff,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 1000,
            backoff: Backoff::Exponential,
        }
    }
}

/// Rate limiter defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum admissions per window.
    pub max_requests: usize,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_ms: 60_000,
        }
    }
}

/// TTL cache defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied by `TtlCache::insert`, in milliseconds.
    pub default_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { default_ttl_ms: 60_000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:3000/api");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.retries.max_retries, 3);
        assert_eq!(config.retries.delay_ms, 1000);
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.cache.default_ttl_ms, 60_000);
        assert!(config.credentials.store_path.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [api]
            base_url = "https://cms.example.com/api"

            [retries]
            backoff = "linear"

            [rate_limit]
            max_requests = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://cms.example.com/api");
        assert_eq!(config.api.timeout_ms, 10_000);
        assert_eq!(config.retries.backoff, Backoff::Linear);
        assert_eq!(config.rate_limit.max_requests, 2);
        assert_eq!(config.rate_limit.window_ms, 60_000);
    }
}
