//! User administration endpoints.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::api::{ApiClient, ApiRequest, ApiResponse, ApiResult, FilePart, Paginated};

/// File name given to `export` downloads.
pub const EXPORT_FILE_NAME: &str = "users.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Listing filters; unset fields are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilters {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
    pub search: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub email_verified: Option<bool>,
}

impl UserFilters {
    /// Query pairs in a stable order, keyed the way the server expects.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(order) = self.order {
            pairs.push(("order", order.as_str().to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(role) = &self.role {
            pairs.push(("role", role.clone()));
        }
        if let Some(is_active) = self.is_active {
            pairs.push(("isActive", is_active.to_string()));
        }
        if let Some(email_verified) = self.email_verified {
            pairs.push(("emailVerified", email_verified.to_string()));
        }
        pairs
    }

    fn apply(&self, request: ApiRequest) -> ApiRequest {
        self.query_pairs()
            .into_iter()
            .fold(request, |request, (key, value)| request.query(key, value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub verified: u64,
    pub unverified: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarUpload {
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: u64,
    pub failed: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Serialize)]
struct IdsBody<'a> {
    ids: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    is_active: bool,
}

#[derive(Serialize)]
struct RoleBody<'a> {
    role: &'a str,
}

/// The listing endpoint answers with a page either bare or inside an envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum PageReply<T> {
    Bare(Paginated<T>),
    Wrapped(ApiResponse<Paginated<T>>),
}

/// User administration.
#[derive(Debug, Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `GET /users` with filters as query parameters.
    pub async fn list(&self, filters: &UserFilters) -> ApiResult<Paginated<User>> {
        let request = filters.apply(ApiRequest::get("/users"));
        let reply: PageReply<User> = self.client.request_body(request).await?;
        match reply {
            PageReply::Bare(page) => Ok(page),
            PageReply::Wrapped(envelope) => envelope.into_data(),
        }
    }

    pub async fn get(&self, id: &str) -> ApiResult<ApiResponse<User>> {
        self.client.get(&format!("/users/{}", id)).await
    }

    pub async fn create(&self, request: &CreateUserRequest) -> ApiResult<ApiResponse<User>> {
        self.client.post("/users", request).await
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateUserRequest,
    ) -> ApiResult<ApiResponse<User>> {
        self.client.put(&format!("/users/{}", id), request).await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<ApiResponse<Option<serde_json::Value>>> {
        self.client.delete(&format!("/users/{}", id)).await
    }

    pub async fn bulk_delete(
        &self,
        ids: &[String],
    ) -> ApiResult<ApiResponse<Option<serde_json::Value>>> {
        self.client.post("/users/bulk-delete", &IdsBody { ids }).await
    }

    /// Activate or deactivate an account.
    pub async fn set_active(&self, id: &str, is_active: bool) -> ApiResult<ApiResponse<User>> {
        self.client
            .patch(&format!("/users/{}/status", id), &StatusBody { is_active })
            .await
    }

    pub async fn change_role(&self, id: &str, role: &str) -> ApiResult<ApiResponse<User>> {
        self.client
            .patch(&format!("/users/{}/role", id), &RoleBody { role })
            .await
    }

    /// Ask the server to send the user a password reset.
    pub async fn reset_password(
        &self,
        id: &str,
    ) -> ApiResult<ApiResponse<Option<serde_json::Value>>> {
        self.client
            .request(ApiRequest::post(format!("/users/{}/reset-password", id)))
            .await
    }

    pub async fn upload_avatar(
        &self,
        id: &str,
        file: FilePart,
    ) -> ApiResult<ApiResponse<AvatarUpload>> {
        self.client.upload(&format!("/users/{}/avatar", id), file).await
    }

    pub async fn stats(&self) -> ApiResult<ApiResponse<UserStats>> {
        self.client.get("/users/stats").await
    }

    /// Download the filtered listing as `users.csv` into the download directory.
    pub async fn export(&self, filters: &UserFilters) -> ApiResult<PathBuf> {
        let request = filters.apply(ApiRequest::get("/users/export"));
        self.client
            .download_request(request, Some(EXPORT_FILE_NAME))
            .await
    }

    /// Upload a CSV of users.
    pub async fn import(&self, file: FilePart) -> ApiResult<ApiResponse<ImportReport>> {
        self.client.upload("/users/import", file).await
    }
}
