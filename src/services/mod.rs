//! Typed endpoint groups layered on `ApiClient`.
//!
//! # Data Flow
//! ```text
//! caller
//!     → users.rs  (/users: listing, CRUD, status/role, avatar, CSV import/export)
//!     → common.rs (/health, /system/info, /upload, /feedback, /config, /cache)
//!     → ApiClient (auth, request IDs, one-shot refresh, error normalization)
//! ```
//!
//! # Design Decisions
//! - Services hold a cloned `ApiClient`; they share its credentials and session
//! - Envelopes are returned unchanged, callers choose `into_data` when they want
//! - Only `CommonService` keeps local state: a TTL cache for read-mostly endpoints

pub mod common;
pub mod users;

pub use common::CommonService;
pub use users::{UserFilters, UserService};
