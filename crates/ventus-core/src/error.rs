//! Error vocabulary shared by every Ventus crate.
//!
//! Lower layers keep their own error enums and convert into [`AppError`] at
//! the view-model edge. The `user_message()` strings are safe to show as-is.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Issue(#[from] IssueError),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A service failure with no closer category
    #[error("{0}")]
    Service(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(e) => e.user_message(),
            Self::Config(e) => e.user_message(),
            Self::Auth(e) => e.user_message(),
            Self::Issue(e) => e.user_message(),
            Self::Io(_) => "Could not read or write a local file.",
            Self::Service(_) | Self::Other(_) => "Something went wrong. Please try again.",
        }
    }

    /// The API key is missing or was rejected.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::Auth(AuthError::NotAuthenticated | AuthError::InvalidApiKey)
        )
    }
}

/// The tracker could not be reached or answered with something unusable.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("tracker unreachable: {0}")]
    Unreachable(String),

    #[error("tracker did not answer in time")]
    TimedOut,

    #[error("tracker answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unreadable tracker response: {0}")]
    Malformed(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "Could not reach the server. Check your connection.",
            Self::TimedOut => "The server took too long to answer. Please try again.",
            Self::Status { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            Self::Status { .. } => "The request failed. Please try again.",
            Self::Malformed(_) => "Received an unexpected response. Please try again.",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed validation; the message lists every offending field.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("cannot read {0}")]
    Unreadable(String),

    #[error("malformed config file: {0}")]
    Malformed(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "Some settings are invalid. Check config.toml.",
            Self::Unreadable(_) => "The settings file could not be read.",
            Self::Malformed(_) => "The settings file is not valid TOML.",
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no API key in the session")]
    NotAuthenticated,

    #[error("API key rejected")]
    InvalidApiKey,

    #[error("forbidden")]
    Forbidden,

    #[error("user {0} has no API key")]
    MissingApiKey(String),

    #[error("session storage: {0}")]
    StorageError(String),
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "Not signed in. Please select a user first.",
            Self::InvalidApiKey => "Your API key was rejected. Please sign in again.",
            Self::Forbidden => "You don't have permission to do that.",
            Self::MissingApiKey(_) => "That user has no API key and cannot be used to sign in.",
            Self::StorageError(_) => "Signed in, but the session could not be saved.",
        }
    }
}

/// Failures tied to a specific issue or reference-data item.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("rejected fields: {0}")]
    Validation(String),

    #[error("bad request: {0}")]
    InvalidRequest(String),
}

impl IssueError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "That item no longer exists. It may have been deleted.",
            Self::Validation(_) => "Some fields are invalid. Please check and try again.",
            Self::InvalidRequest(_) => "That request is not valid.",
        }
    }
}

/// Classify a reqwest failure that carries no usable response.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            return NetworkError::TimedOut;
        }
        if self.is_decode() {
            return NetworkError::Malformed(self.to_string());
        }
        match self.status() {
            Some(status) if !self.is_connect() => NetworkError::Status {
                status: status.as_u16(),
                message: self.to_string(),
            },
            _ => NetworkError::Unreachable(self.to_string()),
        }
    }
}
