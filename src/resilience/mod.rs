//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Caller-composed, around any async operation (usually an ApiClient call):
//!     → rate_limit.rs (wait for sliding-window capacity)
//!     → timeouts.rs (optional overall deadline)
//!     → retries.rs (retry non-client failures with backoff.rs delays)
//! ```
//!
//! # Design Decisions
//! - None of these utilities share state with the API client
//! - Client errors (4xx) are never retried
//! - Delays are deterministic: no jitter, driven by the Tokio clock
//! - Stateful pieces take `&mut self`; concurrent callers must serialize

pub mod backoff;
pub mod rate_limit;
pub mod retries;
pub mod timeouts;

pub use backoff::Backoff;
pub use rate_limit::RateLimiter;
pub use retries::{retry, RetryConfig, Retryable};
pub use timeouts::with_timeout;
