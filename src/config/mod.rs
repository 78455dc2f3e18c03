//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply environment overrides)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to ApiClient::new / RateLimiter / TtlCache
//! ```
//!
//! # Design Decisions
//! - Config is an explicit constructor argument; there is no global client
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CacheConfig, ClientConfig, CredentialConfig, ObservabilityConfig, RateLimitConfig,
    RetrySettings, API_URL_ENV, DEFAULT_BASE_URL,
};
pub use validation::{validate_config, ValidationError};
