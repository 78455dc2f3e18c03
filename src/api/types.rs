//! Wire types exchanged with the dashboard API.

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ErrorKind, FieldErrors};

/// Uniform response envelope: `{ success, data, message?, errors? }`.
///
/// The client trusts `success` literally and hands the envelope back
/// unchanged; `into_data` is the opt-in way to turn `success: false` into
/// an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            errors: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Unwrap `data`, mapping `success: false` to a 400 descriptor.
    pub fn into_data(self) -> Result<T, ApiError> {
        if self.success {
            return Ok(self.data);
        }

        let message = self
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "API call failed".to_string());
        let mut error = ApiError::new(ErrorKind::Client, 400, message);
        if let Some(errors) = self.errors {
            error = error.with_errors(FieldErrors::from([("default".to_string(), errors)]));
        }
        Err(error)
    }
}

/// Page metadata attached to list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Envelope of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub success: bool,
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub pagination: Pagination,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Tokens handed back by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// The refresh endpoint may answer with bare tokens or an envelope around them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RefreshReply {
    Bare(TokenPair),
    Wrapped(ApiResponse<TokenPair>),
}

impl RefreshReply {
    pub(crate) fn into_tokens(self) -> Option<TokenPair> {
        match self {
            RefreshReply::Bare(tokens) => Some(tokens),
            RefreshReply::Wrapped(envelope) if envelope.success => Some(envelope.data),
            RefreshReply::Wrapped(_) => None,
        }
    }
}
