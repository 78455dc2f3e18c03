//! Typed access to the credential pair.

use std::sync::Arc;

use crate::auth::storage::{CredentialStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// Handle over a shared `CredentialStore`.
///
/// Writes report persistence failures to the caller. `clear` is best effort:
/// a failed removal is logged and the remaining keys are still removed.
#[derive(Debug, Clone)]
pub struct Credentials {
    store: Arc<dyn CredentialStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Overwrite the access token, and the refresh token when one is given.
    pub fn store_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> std::io::Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, access_token).inspect_err(|e| {
            tracing::warn!(error = %e, "Failed to persist access token");
        })?;
        if let Some(refresh_token) = refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, refresh_token).inspect_err(|e| {
                tracing::warn!(error = %e, "Failed to persist refresh token");
            })?;
        }
        Ok(())
    }

    /// Delete both tokens.
    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove credential");
            }
        }
    }
}
