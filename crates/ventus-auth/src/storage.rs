use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::session::AuthUser;

/// File-backed storage for the signed-in user and their API key.
///
/// The session lives next to the config file; there is exactly one per
/// config directory.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    /// Storage at an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Storage in the user's config directory
    pub fn default_location() -> Result<Self> {
        let path = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("ventus")
            .join("session.json");
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the signed-in user
    pub fn store(&self, user: &AuthUser) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create session directory")?;
        }

        let json = serde_json::to_string_pretty(user).context("Failed to serialize session")?;

        fs::write(&self.path, &json).context("Failed to write session file")?;

        tracing::info!("Stored session for user {} at {:?}", user.username, self.path);
        Ok(())
    }

    /// Load the persisted user, `None` when nobody is signed in.
    ///
    /// A corrupt session file is removed and treated as signed out.
    pub fn load(&self) -> Result<Option<AuthUser>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path).context("Failed to read session file")?;

        match serde_json::from_str::<AuthUser>(&json) {
            Ok(user) => {
                tracing::info!("Restored session for user {}", user.username);
                Ok(Some(user))
            }
            Err(e) => {
                tracing::error!("Discarding unreadable session file: {}", e);
                self.clear()?;
                Ok(None)
            }
        }
    }

    /// Remove the persisted session
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to delete session file")?;
            tracing::info!("Cleared session at {:?}", self.path);
        }
        Ok(())
    }

    pub fn has_session(&self) -> bool {
        matches!(self.load(), Ok(Some(_)))
    }
}
