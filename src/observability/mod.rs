//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters via the `metrics` facade)
//!
//! Consumers:
//!     → stderr subscriber installed by the CLI
//!     → any metrics recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber or recorder itself
//! - Every outbound request carries its X-Request-ID into log fields
//! - Without a recorder installed, metric calls are no-ops

pub mod logging;
pub mod metrics;
