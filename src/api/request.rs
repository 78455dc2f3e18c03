//! Request Envelope and the replay policy.
//!
//! An `ApiRequest` is built once per logical call and borrowed by every
//! network attempt, so the body must be replayable: JSON is kept as a
//! `serde_json::Value`, uploads as owned bytes.

use reqwest::{Method, StatusCode};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::api::error::{ApiError, ApiResult, ErrorKind, FALLBACK_STATUS};

/// Header carrying the per-attempt trace identifier.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Multipart field name used by single-file uploads.
pub const UPLOAD_FIELD: &str = "file";

/// A file to send as multipart content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// MIME type; reqwest defaults to `application/octet-stream`.
    pub mime: Option<String>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a file from disk, naming the part after its final path component.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self::new(file_name, bytes))
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(serde_json::Value),
    Multipart {
        files: Vec<(String, FilePart)>,
        fields: Vec<(String, String)>,
    },
}

impl Payload {
    /// Serialize `body` up front. A JSON `null` is sent as no body at all.
    pub fn json<B: Serialize + ?Sized>(body: &B) -> ApiResult<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            ApiError::new(
                ErrorKind::InvalidRequest,
                FALLBACK_STATUS,
                format!("Failed to serialize request body: {}", e),
            )
        })?;
        Ok(match value {
            serde_json::Value::Null => Payload::Empty,
            value => Payload::Json(value),
        })
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Payload::Multipart { .. })
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Extra headers; they replace defaults of the same name.
    pub headers: Vec<(String, String)>,
    /// Replaces the client's default timeout for each attempt of this call.
    pub timeout: Option<Duration>,
    /// Query-string pairs, appended in order.
    pub query: Vec<(String, String)>,
}

/// One logical call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub payload: Payload,
    pub options: RequestOptions,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            payload: Payload::Empty,
            options: RequestOptions::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ApiResult<Self> {
        self.payload = Payload::json(body)?;
        Ok(self)
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.options.query.push((key.into(), value.to_string()));
        self
    }
}

/// Position of a network attempt within one logical call.
///
/// Threaded by value through the pipeline so the replay decision depends
/// only on `(status, attempt)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Attempt(u8);

impl Attempt {
    pub const FIRST: Attempt = Attempt(0);

    pub fn next(self) -> Self {
        Attempt(self.0.saturating_add(1))
    }

    pub fn is_replay(self) -> bool {
        self.0 > 0
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

/// What the pipeline does with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// 2xx: hand the body to the caller.
    Accept,
    /// First 401: refresh credentials, then replay once.
    RefreshAndReplay,
    /// Anything else: normalize into an Error Descriptor.
    Reject,
}

/// Decide what to do with `status` on `attempt`.
pub fn disposition(status: StatusCode, attempt: Attempt) -> Disposition {
    if status.is_success() {
        Disposition::Accept
    } else if status == StatusCode::UNAUTHORIZED && !attempt.is_replay() {
        Disposition::RefreshAndReplay
    } else {
        Disposition::Reject
    }
}

/// Join `path` onto `base` with exactly one `/` between them. Absolute
/// `http(s)://` paths are returned unchanged.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_refreshes_only_once() {
        let first = Attempt::FIRST;
        let replay = first.next();

        assert_eq!(disposition(StatusCode::OK, first), Disposition::Accept);
        assert_eq!(disposition(StatusCode::CREATED, replay), Disposition::Accept);
        assert_eq!(
            disposition(StatusCode::UNAUTHORIZED, first),
            Disposition::RefreshAndReplay
        );
        assert_eq!(disposition(StatusCode::UNAUTHORIZED, replay), Disposition::Reject);
        assert_eq!(disposition(StatusCode::UNAUTHORIZED, replay.next()), Disposition::Reject);
    }

    #[test]
    fn test_other_failures_never_replay() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert_eq!(disposition(status, Attempt::FIRST), Disposition::Reject);
        }
    }

    #[test]
    fn test_join_url() {
        let base = "http://localhost:3000/api";
        assert_eq!(join_url(base, "/users"), "http://localhost:3000/api/users");
        assert_eq!(join_url(base, "users"), "http://localhost:3000/api/users");
        assert_eq!(join_url("http://x/api/", "//users"), "http://x/api/users");
        assert_eq!(join_url(base, ""), base);
        let absolute = "https://cdn.example.com/a.png";
        assert_eq!(join_url(base, absolute), absolute);
    }

    #[test]
    fn test_null_json_becomes_empty() {
        assert_eq!(Payload::json(&()).unwrap(), Payload::Empty);
        assert_eq!(
            Payload::json(&serde_json::json!({"a": 1})).unwrap(),
            Payload::Json(serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn test_builder_collects_overrides() {
        let request = ApiRequest::get("/users")
            .header("Accept-Language", "de")
            .query("page", 2)
            .timeout(Duration::from_secs(3));

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.options.headers, vec![("Accept-Language".into(), "de".into())]);
        assert_eq!(request.options.query, vec![("page".into(), "2".into())]);
        assert_eq!(request.options.timeout, Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_file_part_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avatar.png");
        std::fs::write(&path, b"png").unwrap();

        let part = FilePart::from_path(&path).await.unwrap();
        assert_eq!(part.file_name, "avatar.png");
        assert_eq!(part.bytes, b"png".to_vec());
    }
}
