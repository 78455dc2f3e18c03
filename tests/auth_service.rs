//! Integration tests for login, profile and logout flows.

use dashboard_client::auth::service::LoginRequest;
use dashboard_client::auth::{FileCredentialStore, SessionEvent};
use dashboard_client::{ApiClient, AuthService, ClientConfig};
use std::sync::Arc;

mod common;

use common::{FRESH_ACCESS, VALID_REFRESH};

fn credentials(password: &str) -> LoginRequest {
    LoginRequest {
        email: "ada@example.com".into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn test_login_stores_pair_and_profile_uses_it() {
    let api = common::start_mock_api().await;
    let auth = AuthService::new(api.client());

    let res = auth.login(&credentials("secret")).await.unwrap();
    assert_eq!(res.message.as_deref(), Some("Login successful"));
    assert_eq!(res.data.user.email, "ada@example.com");
    assert!(auth.is_authenticated());
    assert_eq!(auth.token().as_deref(), Some(FRESH_ACCESS));
    assert_eq!(
        auth.client().credentials().refresh_token().as_deref(),
        Some(VALID_REFRESH)
    );

    let profile = auth.profile().await.unwrap().into_data().unwrap();
    assert_eq!(profile.name, "Ada");
}

#[tokio::test]
async fn test_failed_login_leaves_store_empty() {
    let api = common::start_mock_api().await;
    let auth = AuthService::new(api.client());

    let err = auth.login(&credentials("wrong")).await.unwrap_err();
    assert_eq!(err.message, "Invalid credentials");
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_even_when_server_fails() {
    let api = common::start_mock_api().await;
    let auth = AuthService::new(api.client());
    auth.client().credentials().store_tokens("other", Some("other-refresh")).unwrap();
    let mut events = auth.client().subscribe_session();

    let err = auth.logout().await.unwrap_err();

    assert_eq!(err.status, 500);
    assert!(auth.token().is_none());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);
}

#[tokio::test]
async fn test_credentials_survive_restart_with_file_store() {
    let api = common::start_mock_api().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let config = ClientConfig::with_base_url(&api.base_url);

    {
        let store = Arc::new(FileCredentialStore::open(&path).unwrap());
        let auth = AuthService::new(ApiClient::new(&config, store).unwrap());
        auth.login(&credentials("secret")).await.unwrap();
    }

    let store = Arc::new(FileCredentialStore::open(&path).unwrap());
    let auth = AuthService::new(ApiClient::new(&config, store).unwrap());
    assert_eq!(auth.token().as_deref(), Some(FRESH_ACCESS));
    assert!(auth.profile().await.unwrap().success);
}
