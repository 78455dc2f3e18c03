//! The outbound request pipeline.
//!
//! # Responsibilities
//! - Resolve paths against the configured base address
//! - Inject `Authorization: Bearer` and `X-Request-ID` on every attempt
//! - Recover a first 401 with one credential refresh and one replay
//! - Normalize every failure into an `ApiError`
//! - Multipart uploads and file downloads

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult, ErrorKind, FALLBACK_STATUS};
use crate::api::request::{
    disposition, join_url, ApiRequest, Attempt, Disposition, FilePart, Payload, UPLOAD_FIELD,
    X_REQUEST_ID,
};
use crate::api::types::{ApiResponse, RefreshReply, RefreshRequest};
use crate::auth::{
    CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore, SessionEvent,
    SessionEvents,
};
use crate::config::ClientConfig;
use crate::observability::metrics;

/// Filename used when nothing better can be inferred.
const DEFAULT_DOWNLOAD_NAME: &str = "download";

/// Client for the dashboard REST API.
///
/// Cheap to clone; clones share the HTTP connection pool, the credential
/// store and the session channel.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    refresh_path: String,
    download_dir: PathBuf,
    credentials: Credentials,
    session: SessionEvents,
}

impl ApiClient {
    /// Create a client over an explicit credential store.
    pub fn new(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> ApiResult<Self> {
        let http = reqwest::Client::builder().build().map_err(|e| {
            ApiError::new(
                ErrorKind::InvalidRequest,
                FALLBACK_STATUS,
                format!("Failed to build HTTP client: {}", e),
            )
        })?;

        tracing::debug!(
            base_url = %config.api.base_url,
            timeout_ms = config.api.timeout_ms,
            "API client created"
        );

        Ok(Self {
            http,
            base_url: config.api.base_url.clone(),
            timeout: config.timeout(),
            refresh_path: config.api.refresh_path.clone(),
            download_dir: config.api.download_dir.clone(),
            credentials: Credentials::new(store),
            session: SessionEvents::new(),
        })
    }

    /// Create a client whose store follows `config.credentials`: a JSON file
    /// when `store_path` is set, memory otherwise.
    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        let store: Arc<dyn CredentialStore> = match &config.credentials.store_path {
            Some(path) => Arc::new(FileCredentialStore::open(path).map_err(|e| ApiError::io(&e))?),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        Self::new(config, store)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn session(&self) -> &SessionEvents {
        &self.session
    }

    /// Listen for `SessionEvent`s such as `LoginRequired`.
    pub fn subscribe_session(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<ApiResponse<T>> {
        self.request(ApiRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> ApiResult<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<ApiResponse<T>> {
        self.request(ApiRequest::delete(path)).await
    }

    /// POST a single file as multipart content under the `file` field.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file: FilePart,
    ) -> ApiResult<ApiResponse<T>> {
        let payload = Payload::Multipart {
            files: vec![(UPLOAD_FIELD.to_string(), file)],
            fields: Vec::new(),
        };
        self.request(ApiRequest::post(path).payload(payload)).await
    }

    /// POST several files as `files[0]`, `files[1]`, … plus extra text fields.
    pub async fn upload_files<T: DeserializeOwned>(
        &self,
        path: &str,
        files: Vec<FilePart>,
        fields: Vec<(String, String)>,
    ) -> ApiResult<ApiResponse<T>> {
        let files = files
            .into_iter()
            .enumerate()
            .map(|(i, file)| (format!("files[{}]", i), file))
            .collect();
        let payload = Payload::Multipart { files, fields };
        self.request(ApiRequest::post(path).payload(payload)).await
    }

    /// GET a binary body and save it into the download directory.
    ///
    /// The file is named `filename` when given, else after the
    /// `Content-Disposition` header, else after the last URL segment.
    pub async fn download(&self, path: &str, filename: Option<&str>) -> ApiResult<PathBuf> {
        self.download_request(ApiRequest::get(path), filename).await
    }

    /// `download` with per-call overrides.
    pub async fn download_request(
        &self,
        request: ApiRequest,
        filename: Option<&str>,
    ) -> ApiResult<PathBuf> {
        let response = self.execute(&request).await?;

        let name = filename
            .and_then(sanitize_filename)
            .or_else(|| content_disposition_filename(response.headers()))
            .or_else(|| {
                response
                    .url()
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .and_then(sanitize_filename)
            })
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string());

        let bytes = response.bytes().await.map_err(|e| ApiError::transport(&e))?;

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| ApiError::io(&e))?;
        let target = self.download_dir.join(&name);
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| ApiError::io(&e))?;

        tracing::info!(path = ?target, bytes = bytes.len(), "Download saved");
        Ok(target)
    }

    /// Run `request` through the pipeline and decode the envelope.
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> ApiResult<ApiResponse<T>> {
        self.request_body(request).await
    }

    /// Run `request` and decode the body as `R` instead of the plain envelope,
    /// e.g. `Paginated<T>`.
    ///
    /// A 2xx without a body (such as `204 No Content`) decodes as
    /// `{ "success": true, "data": null }`.
    pub async fn request_body<R: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<R> {
        let response = self.execute(&request).await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| ApiError::transport(&e))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(serde_json::json!({ "success": true, "data": null }))
                .map_err(|e| ApiError::malformed(status, e));
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::malformed(status, e))
    }

    /// Send `request`, replaying it once after a successful refresh.
    async fn execute(&self, request: &ApiRequest) -> ApiResult<Response> {
        let mut attempt = Attempt::FIRST;

        loop {
            let response = self.send(request, attempt).await?;

            match disposition(response.status(), attempt) {
                Disposition::Accept => return Ok(response),
                Disposition::Reject => return Err(error_from_response(response).await),
                Disposition::RefreshAndReplay => {
                    let original = error_from_response(response).await;
                    self.recover_session(original).await?;
                    attempt = attempt.next();
                }
            }
        }
    }

    /// One network attempt.
    async fn send(&self, request: &ApiRequest, attempt: Attempt) -> ApiResult<Response> {
        let url = self.resolve(&request.path)?;
        let request_id = Uuid::new_v4().to_string();
        let headers = self.headers_for(request, &request_id)?;
        let timeout = request.options.timeout.unwrap_or(self.timeout);

        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .timeout(timeout)
            .headers(headers);

        if !request.options.query.is_empty() {
            builder = builder.query(&request.options.query);
        }

        builder = match &request.payload {
            Payload::Empty => builder,
            Payload::Json(value) => builder.json(value),
            Payload::Multipart { files, fields } => builder.multipart(build_form(files, fields)?),
        };

        tracing::debug!(
            request_id = %request_id,
            method = %request.method,
            url = %url,
            attempt = attempt.number(),
            "Sending request"
        );

        match builder.send().await {
            Ok(response) => {
                let status = response.status();
                metrics::record_request(request.method.as_str(), status.as_u16());
                tracing::debug!(
                    request_id = %request_id,
                    status = status.as_u16(),
                    "Response received"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    method = %request.method,
                    url = %url,
                    error = %e,
                    "Request failed before a response arrived"
                );
                Err(ApiError::transport(&e))
            }
        }
    }

    fn resolve(&self, path: &str) -> ApiResult<url::Url> {
        let joined = join_url(&self.base_url, path);
        url::Url::parse(&joined).map_err(|e| {
            ApiError::new(
                ErrorKind::InvalidRequest,
                FALLBACK_STATUS,
                format!("Invalid URL '{}': {}", joined, e),
            )
        })
    }

    fn headers_for(&self, request: &ApiRequest, request_id: &str) -> ApiResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        // reqwest writes the multipart boundary itself.
        if !request.payload.is_multipart() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        for (name, value) in &request.options.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(invalid_header)?;
            if name == CONTENT_TYPE && request.payload.is_multipart() {
                continue;
            }
            let value = HeaderValue::from_str(value).map_err(invalid_header)?;
            headers.insert(name, value);
        }

        if let Some(token) = self.credentials.access_token() {
            let mut value =
                HeaderValue::from_str(&format!("Bearer {}", token)).map_err(invalid_header)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        headers.insert(
            HeaderName::from_static(X_REQUEST_ID),
            HeaderValue::from_str(request_id).map_err(invalid_header)?,
        );

        Ok(headers)
    }

    /// Refresh after a first 401. On failure the session is torn down and the
    /// original 401 comes back as a `Session` error.
    async fn recover_session(&self, original: ApiError) -> ApiResult<()> {
        match self.refresh_credentials().await {
            Ok(()) => {
                self.session.notify(SessionEvent::TokensRefreshed);
                Ok(())
            }
            Err(reason) => {
                tracing::warn!(
                    status = reason.status,
                    error = %reason,
                    "Session could not be refreshed, clearing credentials"
                );
                self.credentials.clear();
                metrics::record_session_expired();
                self.session.notify(SessionEvent::LoginRequired);
                Err(ApiError {
                    kind: ErrorKind::Session,
                    ..original
                })
            }
        }
    }

    /// Exchange the refresh token for a new credential pair.
    ///
    /// Uses the raw HTTP client: the refresh call never carries the expired
    /// bearer token and never recurses into the 401 path.
    async fn refresh_credentials(&self) -> ApiResult<()> {
        let Some(refresh_token) = self.credentials.refresh_token() else {
            metrics::record_token_refresh("missing");
            return Err(ApiError::new(ErrorKind::Session, 401, "No refresh token available"));
        };

        let url = self.resolve(&self.refresh_path)?;
        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(request_id = %request_id, url = %url, "Refreshing credentials");

        let response = self
            .http
            .post(url)
            .timeout(self.timeout)
            .header(X_REQUEST_ID, request_id.as_str())
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| {
                metrics::record_token_refresh("failure");
                ApiError::transport(&e)
            })?;

        if !response.status().is_success() {
            metrics::record_token_refresh("failure");
            return Err(error_from_response(response).await);
        }

        let status = response.status().as_u16();
        let reply: RefreshReply = response.json().await.map_err(|e| {
            metrics::record_token_refresh("failure");
            ApiError::malformed(status, e)
        })?;
        let Some(tokens) = reply.into_tokens() else {
            metrics::record_token_refresh("failure");
            return Err(ApiError::new(ErrorKind::Session, 401, "Token refresh was rejected"));
        };

        self.credentials
            .store_tokens(&tokens.access_token, tokens.refresh_token.as_deref())
            .map_err(|e| {
                metrics::record_token_refresh("failure");
                ApiError::io(&e)
            })?;
        metrics::record_token_refresh("success");
        tracing::info!(request_id = %request_id, "Credentials refreshed");
        Ok(())
    }
}

/// Drain a non-2xx response into an Error Descriptor.
async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    let error = ApiError::from_status(status.as_u16(), &body);
    if status == StatusCode::UNAUTHORIZED {
        tracing::debug!(message = %error.message, "Unauthorized");
    }
    error
}

fn build_form(files: &[(String, FilePart)], fields: &[(String, String)]) -> ApiResult<Form> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name.clone(), value.clone());
    }
    for (name, file) in files {
        let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        if let Some(mime) = &file.mime {
            part = part.mime_str(mime).map_err(|e| {
                ApiError::new(
                    ErrorKind::InvalidRequest,
                    FALLBACK_STATUS,
                    format!("Invalid MIME type '{}': {}", mime, e),
                )
            })?;
        }
        form = form.part(name.clone(), part);
    }
    Ok(form)
}

fn invalid_header(e: impl std::fmt::Display) -> ApiError {
    ApiError::new(
        ErrorKind::InvalidRequest,
        FALLBACK_STATUS,
        format!("Invalid header: {}", e),
    )
}

/// Filename from `Content-Disposition: attachment; filename="report.csv"`.
fn content_disposition_filename(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    value
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("filename="))
        .map(|raw| raw.trim_matches('"'))
        .and_then(sanitize_filename)
}

/// Keep only the final path component, refusing empty and dot names.
fn sanitize_filename(name: &str) -> Option<String> {
    let name = Path::new(name.trim()).file_name()?.to_str()?;
    (!name.is_empty() && name != "." && name != "..").then(|| name.to_string())
}
