//! Shared utilities for integration testing: an in-process mock of the
//! dashboard API.

use axum::extract::{Multipart, Path, RawQuery, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use dashboard_client::auth::MemoryCredentialStore;
use dashboard_client::{ApiClient, ClientConfig};

pub const FRESH_ACCESS: &str = "fresh-access";
pub const STALE_ACCESS: &str = "stale-access";
pub const VALID_REFRESH: &str = "valid-refresh";
pub const ROTATED_REFRESH: &str = "rotated-refresh";

/// Call counters and captured headers, shared with the test body.
#[derive(Default)]
pub struct MockState {
    pub me_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub always_401_calls: AtomicUsize,
    pub flaky_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub garbled_calls: AtomicUsize,
    pub system_info_calls: AtomicUsize,
    pub request_ids: Mutex<Vec<String>>,
    pub last_query: Mutex<Option<String>>,
}

impl MockState {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn request_ids(&self) -> Vec<String> {
        self.request_ids.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().unwrap().clone()
    }

    fn record_query(&self, query: Option<String>) {
        *self.last_query.lock().unwrap() = query;
    }

    fn capture(&self, headers: &HeaderMap) {
        if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
            self.request_ids.lock().unwrap().push(id.to_string());
        }
    }
}

pub struct MockApi {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockApi {
    /// Client with an in-memory store pointed at this mock.
    #[allow(dead_code)]
    pub fn client(&self) -> ApiClient {
        self.client_with(ClientConfig::with_base_url(&self.base_url))
    }

    #[allow(dead_code)]
    pub fn client_with(&self, config: ClientConfig) -> ApiClient {
        ApiClient::new(&config, Arc::new(MemoryCredentialStore::new())).unwrap()
    }
}

/// Start the mock API on an ephemeral port.
pub async fn start_mock_api() -> MockApi {
    let state = Arc::new(MockState::default());

    let app = Router::new()
        .route("/api/users/me", get(me))
        .route("/api/auth/profile", get(me))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/always-401", get(always_401))
        .route("/api/not-found", get(not_found))
        .route("/api/flaky", get(flaky))
        .route("/api/echo", any(echo))
        .route("/api/echo-upload", post(upload))
        .route("/api/upload", post(store_file))
        .route("/api/upload/multiple", post(store_files))
        .route("/api/slow", get(slow))
        .route("/api/garbled", post(garbled))
        .route("/api/users", get(list_users))
        .route("/api/users/export", get(export_users))
        .route("/api/users/bulk-delete", post(bulk_delete))
        .route("/api/users/{id}", get(get_user).delete(delete_user))
        .route("/api/users/{id}/status", patch(set_status))
        .route("/api/system/info", get(system_info))
        .route("/api/cache/clear", post(clear_cache))
        .route("/api/files/report", get(report))
        .route("/api/files/raw/{name}", get(raw_file))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockApi {
        base_url: format!("http://{}/api", addr),
        state,
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    state.capture(&headers);
    if bearer(&headers) != Some(FRESH_ACCESS) {
        return unauthorized("Token expired");
    }
    Json(json!({
        "success": true,
        "data": {
            "id": "u1",
            "name": "Ada",
            "email": "ada@example.com",
            "role": "admin",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z"
        }
    }))
    .into_response()
}

async fn refresh(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    state.capture(&headers);
    if bearer(&headers).is_some() {
        return (StatusCode::BAD_REQUEST, "refresh must not carry a bearer token").into_response();
    }
    if body["refreshToken"] != VALID_REFRESH {
        return unauthorized("Invalid refresh token");
    }
    Json(json!({ "accessToken": FRESH_ACCESS, "refreshToken": ROTATED_REFRESH })).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != "secret" {
        return unauthorized("Invalid credentials");
    }
    Json(json!({
        "success": true,
        "data": {
            "accessToken": FRESH_ACCESS,
            "refreshToken": VALID_REFRESH,
            "user": { "id": "u1", "email": body["email"], "name": "Ada", "role": "admin" }
        },
        "message": "Login successful"
    }))
    .into_response()
}

async fn logout(headers: HeaderMap) -> Response {
    if bearer(&headers) != Some(FRESH_ACCESS) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "message": "Session store unavailable" })),
        )
            .into_response();
    }
    Json(json!({ "success": true, "message": "Logged out" })).into_response()
}

async fn always_401(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.always_401_calls.fetch_add(1, Ordering::SeqCst);
    state.capture(&headers);
    unauthorized("Not allowed")
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Item not found",
            "errors": { "id": ["does not exist"] }
        })),
    )
        .into_response()
}

async fn flaky(State(state): State<Arc<MockState>>) -> Response {
    let call = state.flaky_calls.fetch_add(1, Ordering::SeqCst);
    if call < 2 {
        return (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response();
    }
    Json(json!({ "success": true, "data": { "call": call } })).into_response()
}

async fn echo(
    State(state): State<Arc<MockState>>,
    method: Method,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.capture(&headers);
    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "success": true,
        "data": {
            "method": method.as_str(),
            "body": parsed,
            "requestId": header_value("x-request-id"),
            "contentType": header_value("content-type"),
            "tenant": header_value("x-tenant")
        }
    }))
    .into_response()
}

async fn upload(mut multipart: Multipart) -> Response {
    let mut files = Vec::new();
    let mut fields = serde_json::Map::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field.bytes().await.unwrap_or_default();
                files.push(json!({ "field": name, "fileName": file_name, "size": bytes.len() }));
            }
            None => {
                let text = field.text().await.unwrap_or_default();
                fields.insert(name, Value::String(text));
            }
        }
    }
    Json(json!({ "success": true, "data": { "files": files, "fields": fields } })).into_response()
}

async fn report() -> Response {
    (
        [(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"report.csv\"",
        )],
        "a,b\n1,2\n",
    )
        .into_response()
}

async fn raw_file() -> Response {
    (StatusCode::OK, vec![0u8, 1, 2, 3]).into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({ "success": true, "data": null })).into_response()
}

/// Applies the write, then answers with something that is not JSON.
async fn garbled(State(state): State<Arc<MockState>>) -> Response {
    state.garbled_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, "<html>saved</html>").into_response()
}

fn user(id: &str, is_active: bool) -> Value {
    json!({
        "id": id,
        "name": "Ada",
        "email": "ada@example.com",
        "role": "admin",
        "isActive": is_active,
        "emailVerified": true,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-02T00:00:00Z"
    })
}

async fn list_users(
    State(state): State<Arc<MockState>>,
    RawQuery(query): RawQuery,
) -> Response {
    state.record_query(query);
    Json(json!({
        "success": true,
        "data": {
            "success": true,
            "data": [user("u1", true), user("u2", false)],
            "pagination": { "page": 1, "limit": 2, "total": 5, "totalPages": 3 }
        }
    }))
    .into_response()
}

async fn export_users(
    State(state): State<Arc<MockState>>,
    RawQuery(query): RawQuery,
) -> Response {
    state.record_query(query);
    "id,name\nu1,Ada\n".into_response()
}

async fn bulk_delete(Json(body): Json<Value>) -> Response {
    let count = body["ids"].as_array().map(Vec::len).unwrap_or_default();
    Json(json!({ "success": true, "message": format!("Deleted {} users", count) }))
        .into_response()
}

async fn get_user(Path(id): Path<String>) -> Response {
    Json(json!({ "success": true, "data": user(&id, true) })).into_response()
}

async fn delete_user(State(state): State<Arc<MockState>>) -> Response {
    state.delete_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT.into_response()
}

async fn set_status(Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    let is_active = body["isActive"].as_bool().unwrap_or_default();
    Json(json!({ "success": true, "data": user(&id, is_active) })).into_response()
}

async fn system_info(State(state): State<Arc<MockState>>) -> Response {
    state.system_info_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "success": true,
        "data": {
            "version": "1.2.0",
            "environment": "test",
            "database": { "status": "connected", "version": "16" },
            "cache": { "status": "connected", "type": "memory" }
        }
    }))
    .into_response()
}

async fn clear_cache() -> Response {
    Json(json!({ "success": true, "message": "Cache cleared" })).into_response()
}

/// Stored-file records for every file part, filed under the `folder` query
/// parameter or form field.
async fn stored_files(query: Option<String>, mut multipart: Multipart) -> Vec<Value> {
    let mut folder = query
        .as_deref()
        .and_then(|q| q.strip_prefix("folder="))
        .map(str::to_string);
    let mut files = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let size = field.bytes().await.unwrap_or_default().len();
                files.push((file_name, mime, size));
            }
            None if field.name() == Some("folder") => {
                folder = field.text().await.ok();
            }
            None => {}
        }
    }
    let prefix = folder.map(|f| format!("{}/", f)).unwrap_or_default();
    files
        .into_iter()
        .map(|(file_name, mime, size)| {
            json!({
                "url": format!("/files/{}{}", prefix, file_name),
                "filename": file_name,
                "size": size,
                "mimeType": mime
            })
        })
        .collect()
}

async fn store_file(
    State(state): State<Arc<MockState>>,
    RawQuery(query): RawQuery,
    multipart: Multipart,
) -> Response {
    state.record_query(query.clone());
    let files = stored_files(query, multipart).await;
    let first = files.into_iter().next().unwrap_or(Value::Null);
    Json(json!({ "success": true, "data": first })).into_response()
}

async fn store_files(multipart: Multipart) -> Response {
    let files = stored_files(None, multipart).await;
    Json(json!({ "success": true, "data": files })).into_response()
}
