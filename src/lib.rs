//! Client library for the admin dashboard REST API.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller
//!       │  get / post / put / patch / delete / upload / download
//!       ▼
//!  ┌───────────────────────────── ApiClient ──────────────────────────────┐
//!  │  resolve path ─▶ Bearer + X-Request-ID ─▶ send ─▶ disposition        │
//!  │                                                   │                  │
//!  │                               2xx ◀───────────────┤                  │
//!  │               401 (first) ─▶ refresh ─▶ replay once                  │
//!  │                               other ─▶ ApiError (Error Descriptor)   │
//!  └──────────────────────────────────────────────────────────────────────┘
//!       │                          │
//!       ▼                          ▼
//!   auth (credential store,    services (users, common)
//!   session events, service)   observability (tracing, metrics)
//!
//!  Independent utilities composed by callers:
//!   resilience::retry   resilience::RateLimiter   cache::TtlCache
//! ```

// Core
pub mod api;
pub mod auth;
pub mod config;

// Endpoint groups
pub mod services;

// Caller-composed utilities
pub mod cache;
pub mod resilience;

// Cross-cutting concerns
pub mod observability;

pub use api::{ApiClient, ApiError, ApiResponse, ApiResult};
pub use auth::AuthService;
pub use cache::TtlCache;
pub use config::ClientConfig;
pub use resilience::{retry, RateLimiter, RetryConfig};
pub use services::{CommonService, UserService};
