//! Error Descriptor: the one failure shape every API call surfaces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::resilience::Retryable;

/// Status used when the transport never produced one.
pub const FALLBACK_STATUS: u16 = 500;

/// Field name → messages, as reported by the server.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Where in the pipeline a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response reached the client (connect, DNS, reset).
    Transport,
    /// The attempt exceeded its deadline.
    Timeout,
    /// 401 surfaced after the refresh path ran and replayed.
    Unauthorized,
    /// 401 that could not be recovered; credentials were cleared.
    Session,
    /// Any other 4xx.
    Client,
    /// 5xx.
    Server,
    /// 2xx body that did not decode.
    Malformed,
    /// The request could not be built (bad URL, header, body).
    InvalidRequest,
    /// A downloaded file could not be written.
    Io,
}

/// Normalized failure: `{ message, status, errors? }`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub message: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    pub kind: ErrorKind,
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(kind: ErrorKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            errors: None,
            kind,
        }
    }

    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = (!errors.is_empty()).then_some(errors);
        self
    }

    /// Failure before any response arrived.
    pub fn transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorKind::Timeout, FALLBACK_STATUS, err.to_string())
        } else if err.is_builder() {
            Self::new(ErrorKind::InvalidRequest, FALLBACK_STATUS, err.to_string())
        } else {
            Self::new(ErrorKind::Transport, FALLBACK_STATUS, err.to_string())
        }
    }

    /// Build a descriptor from a non-2xx status and its raw body.
    ///
    /// `message` and `errors` come from a JSON body when present; otherwise
    /// a generic message naming the status is used.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let kind = match status {
            401 => ErrorKind::Unauthorized,
            400..=499 => ErrorKind::Client,
            _ => ErrorKind::Server,
        };

        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        let message = parsed
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Request failed with status code {}", status));

        let mut error = Self::new(kind, status, message);
        if let Some(errors) = parsed.errors {
            error = error.with_errors(errors.into_map());
        }
        error
    }

    /// A body that did not decode. `status` is the one the server sent.
    pub fn malformed(status: u16, detail: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorKind::Malformed,
            status,
            format!("Malformed response body: {}", detail),
        )
    }

    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout, FALLBACK_STATUS, "Request timeout")
    }

    pub fn io(err: &std::io::Error) -> Self {
        Self::new(ErrorKind::Io, FALLBACK_STATUS, err.to_string())
    }

    /// Human-readable one-liner: field errors when present, else the message.
    pub fn summary(&self) -> String {
        match &self.errors {
            Some(errors) if !errors.is_empty() => errors
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                .collect::<Vec<_>>()
                .join("; "),
            _ => self.message.clone(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind == ErrorKind::Session
    }
}

impl Retryable for ApiError {
    fn status_code(&self) -> Option<u16> {
        Some(self.status)
    }

    /// The server already handled a malformed reply, and an invalid request
    /// fails the same way every time.
    fn is_retryable(&self) -> bool {
        !self.is_client_error()
            && !matches!(self.kind, ErrorKind::Malformed | ErrorKind::InvalidRequest)
    }
}

/// Subset of an error body the client understands.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    errors: Option<ServerErrors>,
}

/// Servers send either a field map or a flat list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerErrors {
    Fields(FieldErrors),
    List(Vec<String>),
}

impl ServerErrors {
    fn into_map(self) -> FieldErrors {
        match self {
            ServerErrors::Fields(map) => map,
            ServerErrors::List(list) if list.is_empty() => FieldErrors::new(),
            ServerErrors::List(list) => FieldErrors::from([("default".to_string(), list)]),
        }
    }
}
