//! Health, system information, shared file storage and feedback endpoints.
//!
//! # Responsibilities
//! - Thin typed wrappers over the shared `/upload`, `/health`, `/system`,
//!   `/feedback`, `/config`, `/time` and `/cache` endpoints
//! - Memoize read-mostly endpoints (`/system/info`, `/config`) in a `TtlCache`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::api::request::UPLOAD_FIELD;
use crate::api::{ApiClient, ApiError, ApiRequest, ApiResponse, ApiResult, FilePart, Payload};
use crate::cache::TtlCache;
use crate::config::CacheConfig;

const SYSTEM_INFO_PATH: &str = "/system/info";
const APP_CONFIG_PATH: &str = "/config";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub timestamp: String,
    pub uptime: f64,
    pub version: String,
    pub environment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub status: Connectivity,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub status: Connectivity,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub version: String,
    pub environment: String,
    pub database: DatabaseInfo,
    pub cache: CacheInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTime {
    pub timestamp: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Bug,
    Feature,
    General,
}

#[derive(Debug, Clone, Serialize)]
pub struct Feedback {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub subject: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    #[serde(default)]
    pub limits: BTreeMap<String, f64>,
    #[serde(default)]
    pub settings: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub keys: u64,
    pub memory: u64,
}

/// Shared endpoints, with successful `/system/info` and `/config` replies
/// memoized for the configured TTL.
#[derive(Debug)]
pub struct CommonService {
    client: ApiClient,
    cache: Mutex<TtlCache<&'static str, ApiResponse<Value>>>,
}

impl CommonService {
    pub fn new(client: ApiClient, cache: &CacheConfig) -> Self {
        Self {
            client,
            cache: Mutex::new(TtlCache::from_config(cache)),
        }
    }

    pub async fn health(&self) -> ApiResult<ApiResponse<HealthCheck>> {
        self.client.get("/health").await
    }

    pub async fn system_info(&self) -> ApiResult<ApiResponse<SystemInfo>> {
        self.cached_get(SYSTEM_INFO_PATH).await
    }

    pub async fn app_config(&self) -> ApiResult<ApiResponse<AppConfig>> {
        self.cached_get(APP_CONFIG_PATH).await
    }

    pub async fn server_time(&self) -> ApiResult<ApiResponse<ServerTime>> {
        self.client.get("/time").await
    }

    /// Store one file, optionally inside `folder`.
    pub async fn upload_file(
        &self,
        file: FilePart,
        folder: Option<&str>,
    ) -> ApiResult<ApiResponse<StoredFile>> {
        let mut request = ApiRequest::post("/upload").payload(Payload::Multipart {
            files: vec![(UPLOAD_FIELD.to_string(), file)],
            fields: Vec::new(),
        });
        if let Some(folder) = folder {
            request = request.query("folder", folder);
        }
        self.client.request(request).await
    }

    /// Store several files in one call; `folder` travels as a form field.
    pub async fn upload_files(
        &self,
        files: Vec<FilePart>,
        folder: Option<&str>,
    ) -> ApiResult<ApiResponse<Vec<StoredFile>>> {
        let fields = folder
            .map(|folder| vec![("folder".to_string(), folder.to_string())])
            .unwrap_or_default();
        self.client.upload_files("/upload/multiple", files, fields).await
    }

    pub async fn file_info(&self, filename: &str) -> ApiResult<ApiResponse<StoredFile>> {
        self.client.get(&format!("/upload/{}", filename)).await
    }

    pub async fn delete_file(&self, filename: &str) -> ApiResult<ApiResponse<Option<Value>>> {
        self.client.delete(&format!("/upload/{}", filename)).await
    }

    /// Save a stored file under its own name in the download directory.
    pub async fn download_file(&self, filename: &str) -> ApiResult<PathBuf> {
        self.client
            .download(&format!("/upload/{}", filename), Some(filename))
            .await
    }

    pub async fn send_feedback(
        &self,
        feedback: &Feedback,
    ) -> ApiResult<ApiResponse<Option<Value>>> {
        self.client.post("/feedback", feedback).await
    }

    /// Flush the server cache, and the local memo along with it.
    pub async fn clear_cache(&self) -> ApiResult<ApiResponse<Option<Value>>> {
        let response = self
            .client
            .request(ApiRequest::post("/cache/clear"))
            .await?;
        self.invalidate();
        Ok(response)
    }

    pub async fn cache_stats(&self) -> ApiResult<ApiResponse<CacheStats>> {
        self.client.get("/cache/stats").await
    }

    /// Drop memoized replies so the next read goes to the server.
    pub fn invalidate(&self) {
        lock(&self.cache).clear();
    }

    async fn cached_get<T: DeserializeOwned>(
        &self,
        path: &'static str,
    ) -> ApiResult<ApiResponse<T>> {
        let cached = lock(&self.cache).get(path).cloned();
        let envelope = match cached {
            Some(envelope) => {
                tracing::debug!(path, "Serving memoized reply");
                envelope
            }
            None => {
                let envelope: ApiResponse<Value> = self.client.get(path).await?;
                if envelope.success {
                    lock(&self.cache).insert(path, envelope.clone());
                }
                envelope
            }
        };
        typed(envelope)
    }
}

fn typed<T: DeserializeOwned>(envelope: ApiResponse<Value>) -> ApiResult<ApiResponse<T>> {
    let data = serde_json::from_value(envelope.data).map_err(|e| ApiError::malformed(200, e))?;
    Ok(ApiResponse {
        success: envelope.success,
        data,
        message: envelope.message,
        errors: envelope.errors,
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
