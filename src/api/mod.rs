//! API client subsystem.
//!
//! # Data Flow
//! ```text
//! caller (get/post/put/patch/delete/upload/download)
//!     → request.rs (ApiRequest: method, path, replayable payload, overrides)
//!     → client.rs send(): Bearer token + fresh X-Request-ID, per-attempt timeout
//!     → request.rs disposition(status, attempt)
//!         Accept            → types.rs ApiResponse<T> returned unchanged
//!         RefreshAndReplay  → POST /auth/refresh → send() again with attempt 1
//!         Reject            → error.rs ApiError (Error Descriptor)
//! ```
//!
//! # Design Decisions
//! - At most one replay per logical call, only after a 401 on the first attempt
//! - No backoff at this layer; callers compose `resilience::retry` around calls
//! - Configuration is explicit; independent clients can coexist

pub mod client;
pub mod error;
pub mod request;
pub mod types;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult, ErrorKind, FieldErrors};
pub use request::{ApiRequest, Attempt, Disposition, FilePart, Payload, RequestOptions};
pub use types::{ApiResponse, Paginated, Pagination, TokenPair};
