//! Backoff delay calculation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the delay grows between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `base × (attempt + 1)`
    Linear,
    /// `base × 2^attempt`
    #[default]
    Exponential,
}

impl Backoff {
    /// Delay to wait after the failed 0-based `attempt`.
    pub fn delay(self, base: Duration, attempt: u32) -> Duration {
        match self {
            Backoff::Linear => base.saturating_mul(attempt.saturating_add(1)),
            Backoff::Exponential => base.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Backoff::Linear => "linear",
            Backoff::Exponential => "exponential",
        }
    }
}
