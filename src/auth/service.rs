//! Login, logout and profile calls layered on `ApiClient`.
//!
//! The service owns no state of its own: tokens live in the client's
//! credential store, so a refresh performed by the pipeline is immediately
//! visible here and vice versa.

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError, ApiResponse, ApiResult, TokenPair};
use crate::auth::session::SessionEvent;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial profile update; unset fields are omitted from the body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

/// Authentication endpoints.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// `POST /auth/login`; a successful envelope stores the credential pair.
    pub async fn login(&self, request: &LoginRequest) -> ApiResult<ApiResponse<LoginResponse>> {
        let response: ApiResponse<LoginResponse> =
            self.client.post("/auth/login", request).await?;
        self.remember(&response)?;
        if response.success {
            tracing::info!(user_id = %response.data.user.id, "Logged in");
        }
        Ok(response)
    }

    /// `POST /auth/register`; behaves like `login` on success.
    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> ApiResult<ApiResponse<LoginResponse>> {
        let response: ApiResponse<LoginResponse> =
            self.client.post("/auth/register", request).await?;
        self.remember(&response)?;
        Ok(response)
    }

    /// `POST /auth/logout`. Credentials are cleared whether or not the call succeeds.
    pub async fn logout(&self) -> ApiResult<ApiResponse<Option<serde_json::Value>>> {
        let result = self.client.post("/auth/logout", &()).await;
        self.client.credentials().clear();
        self.client.session().notify(SessionEvent::SignedOut);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Logout call failed; local credentials cleared anyway");
        }
        result
    }

    /// Explicit refresh through the regular pipeline, outside the 401 path.
    pub async fn refresh_token(&self) -> ApiResult<ApiResponse<TokenPair>> {
        let refresh_token = self.client.credentials().refresh_token().unwrap_or_default();
        let response: ApiResponse<TokenPair> = self
            .client
            .post(
                "/auth/refresh",
                &RefreshBody {
                    refresh_token: &refresh_token,
                },
            )
            .await?;
        if response.success {
            self.client
                .credentials()
                .store_tokens(
                    &response.data.access_token,
                    response.data.refresh_token.as_deref(),
                )
                .map_err(|e| ApiError::io(&e))?;
        }
        Ok(response)
    }

    pub async fn profile(&self) -> ApiResult<ApiResponse<UserProfile>> {
        self.client.get("/auth/profile").await
    }

    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> ApiResult<ApiResponse<UserProfile>> {
        self.client.put("/auth/profile", update).await
    }

    pub async fn change_password(
        &self,
        request: &ChangePasswordRequest,
    ) -> ApiResult<ApiResponse<Option<serde_json::Value>>> {
        self.client.post("/auth/change-password", request).await
    }

    pub async fn forgot_password(
        &self,
        email: &str,
    ) -> ApiResult<ApiResponse<Option<serde_json::Value>>> {
        self.client
            .post("/auth/forgot-password", &EmailBody { email })
            .await
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.credentials().is_authenticated()
    }

    pub fn token(&self) -> Option<String> {
        self.client.credentials().access_token()
    }

    /// Drop local credentials without calling the server.
    pub fn clear(&self) {
        self.client.credentials().clear();
    }

    fn remember(&self, response: &ApiResponse<LoginResponse>) -> ApiResult<()> {
        if response.success {
            self.client
                .credentials()
                .store_tokens(
                    &response.data.access_token,
                    Some(&response.data.refresh_token),
                )
                .map_err(|e| ApiError::io(&e))?;
        }
        Ok(())
    }
}
