//! Timeout enforcement.
//!
//! The API client already bounds each network attempt. `with_timeout` bounds
//! a whole composed operation (for example a retried call) instead.

use std::future::Future;
use std::time::Duration;

use crate::api::{ApiError, ApiResult};

/// Run `future`, failing with a `Timeout` descriptor once `limit` elapses.
pub async fn with_timeout<T, F>(limit: Duration, future: F) -> ApiResult<T>
where
    F: Future<Output = ApiResult<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(limit = ?limit, "Operation timed out");
            Err(ApiError::timeout())
        }
    }
}
