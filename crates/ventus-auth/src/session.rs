//! The signed-in user and the opaque API key attached to every request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use ventus_core::AuthError;

use crate::storage::SessionStorage;

/// A user selected at session start, together with their API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub api_key: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub signed_in_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn new(
        id: i64,
        username: impl Into<String>,
        api_key: impl Into<String>,
        avatar_url: Option<String>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            api_key: api_key.into(),
            avatar_url,
            signed_in_at: Utc::now(),
        }
    }
}

/// Shared handle to the current session.
///
/// Cloning is cheap; every clone observes the same login state, so clients
/// built before a login pick the key up on their next request.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Arc<RwLock<Option<AuthUser>>>,
    storage: Option<SessionStorage>,
}

impl Session {
    /// In-memory session with nobody signed in
    pub fn new() -> Self {
        Self::default()
    }

    /// Session backed by storage; restores a previously persisted user.
    pub fn with_storage(storage: SessionStorage) -> Self {
        let restored = match storage.load() {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Failed to restore session: {}", e);
                None
            }
        };

        Self {
            current: Arc::new(RwLock::new(restored)),
            storage: Some(storage),
        }
    }

    /// Session authenticated with a bare key (e.g. from config or env).
    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        let session = Self::new();
        *session.current.write() = Some(AuthUser::new(0, "api-key", api_key, None));
        session
    }

    /// Sign a user in. Users without a usable key are rejected and the
    /// session is left signed out.
    ///
    /// The in-memory sign-in always happens first; `StorageError` means the
    /// user is signed in for this run but will not be restored next time.
    pub fn login(&self, user: AuthUser) -> Result<(), AuthError> {
        if user.api_key.trim().is_empty() {
            tracing::error!("Login attempt without API key for user {}", user.username);
            self.logout();
            return Err(AuthError::MissingApiKey(user.username));
        }

        tracing::info!("Signed in as {}", user.username);
        let stored = match &self.storage {
            Some(storage) => storage.store(&user),
            None => Ok(()),
        };
        *self.current.write() = Some(user);

        stored.map_err(|e| {
            tracing::warn!("Failed to persist session: {}", e);
            AuthError::StorageError(e.to_string())
        })
    }

    /// Sign in as a user picked from the user list. The list only carries an
    /// optional key, so users without one are refused here.
    pub fn select_user(
        &self,
        id: i64,
        username: &str,
        api_key: Option<&str>,
        avatar_url: Option<String>,
    ) -> Result<AuthUser, AuthError> {
        let user = AuthUser::new(id, username, api_key.unwrap_or_default(), avatar_url);
        self.login(user.clone())?;
        Ok(user)
    }

    pub fn logout(&self) {
        if let Some(user) = self.current.write().take() {
            tracing::info!("Signed out {}", user.username);
        }
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.clear() {
                tracing::warn!("Failed to clear stored session: {}", e);
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.current.read().clone()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.current.read().as_ref().map(|u| u.id)
    }

    /// The key to attach to a request, or `NotAuthenticated`.
    pub fn api_key(&self) -> Result<String, AuthError> {
        self.current
            .read()
            .as_ref()
            .map(|u| u.api_key.clone())
            .ok_or(AuthError::NotAuthenticated)
    }
}
