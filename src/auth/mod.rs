//! Authentication state subsystem.
//!
//! # Data Flow
//! ```text
//! login / register (service.rs)
//!     → credentials.rs writes auth-token + refresh-token
//!     → storage.rs (memory or JSON file)
//!
//! ApiClient request:
//!     → credentials.rs reads auth-token for the Bearer header
//!     → on 401: refresh-token → POST /auth/refresh → credentials.rs overwrites both
//!     → refresh impossible: credentials.rs clears both, session.rs emits LoginRequired
//! ```
//!
//! # Security Constraints
//! - Token values are never logged
//! - The credential pair is only mutated by login, refresh and logout flows

pub mod credentials;
pub mod service;
pub mod session;
pub mod storage;

pub use credentials::Credentials;
pub use service::AuthService;
pub use session::{SessionEvent, SessionEvents};
pub use storage::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
