//! Errors produced by the tracker gateway.

use std::collections::BTreeMap;

use thiserror::Error;
use ventus_core::{AppError, AuthError, IssueError, NetworkError, ReqwestErrorExt};

#[derive(Error, Debug)]
pub enum ServiceError {
    /// No response was received (connect failure, timeout, reset).
    #[error("Transport error: {0}")]
    Transport(NetworkError),

    /// The server rejected a write. `fields` holds per-field messages when
    /// the body was a JSON object of field name to messages.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API key rejected")]
    Unauthorized,

    #[error("Permission denied")]
    Forbidden,

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No API key is available; nothing was sent.
    #[error("Not authenticated")]
    NotAuthenticated,
}

impl ServiceError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Could not reach the server. Check your connection.".to_string(),
            Self::Validation { message, fields } => {
                if fields.is_empty() {
                    if message.is_empty() {
                        "Some fields are invalid. Please check and try again.".to_string()
                    } else {
                        message.clone()
                    }
                } else {
                    fields
                        .iter()
                        .map(|(field, msgs)| format!("{}: {}", field, msgs.join(" ")))
                        .collect::<Vec<_>>()
                        .join("; ")
                }
            }
            Self::NotFound(_) => "That item no longer exists. It may have been deleted.".to_string(),
            Self::Unauthorized => "Your API key was rejected. Please sign in again.".to_string(),
            Self::Forbidden => "You don't have permission to do that.".to_string(),
            Self::Server { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later.".to_string()
            }
            Self::Server { status, .. } => format!("The request failed ({}).", status),
            Self::Decode(_) => "Received an unexpected response. Please try again.".to_string(),
            Self::InvalidRequest(msg) => format!("Invalid request: {}", msg),
            Self::NotAuthenticated => "Not signed in. Please select a user first.".to_string(),
        }
    }

    /// Whether the user must sign in again before further requests can work.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::Unauthorized)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Build a validation error from a 400/422 body.
    pub(crate) fn validation_from_body(body: &str) -> Self {
        let fields = parse_field_errors(body);
        let message = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(map)) => map
                .get("detail")
                .and_then(|d| d.as_str())
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };
        Self::Validation { message, fields }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.into_network_error())
        }
    }
}

/// Lift a gateway failure into the shared error vocabulary.
impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Transport(n) => AppError::Network(n),
            ServiceError::Validation { message, fields } => {
                let detail = if fields.is_empty() {
                    message
                } else {
                    fields.keys().cloned().collect::<Vec<_>>().join(", ")
                };
                AppError::Issue(IssueError::Validation(detail))
            }
            ServiceError::NotFound(s) => AppError::Issue(IssueError::NotFound(s)),
            ServiceError::Unauthorized => AppError::Auth(AuthError::InvalidApiKey),
            ServiceError::Forbidden => AppError::Auth(AuthError::Forbidden),
            ServiceError::Server { status, message } => {
                AppError::Network(NetworkError::Status { status, message })
            }
            ServiceError::Decode(s) => AppError::Network(NetworkError::Malformed(s)),
            ServiceError::InvalidRequest(s) => AppError::Issue(IssueError::InvalidRequest(s)),
            ServiceError::NotAuthenticated => AppError::Auth(AuthError::NotAuthenticated),
        }
    }
}

/// Extract `{ "field": ["msg", ...] }` (or `"field": "msg"`) pairs.
/// `detail` / `non_field_errors` style keys are kept as fields too.
fn parse_field_errors(body: &str) -> BTreeMap<String, Vec<String>> {
    let mut fields = BTreeMap::new();
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) else {
        return fields;
    };

    for (key, value) in map {
        if key == "detail" {
            continue;
        }
        let messages: Vec<String> = match value {
            serde_json::Value::String(s) => vec![s],
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        if !messages.is_empty() {
            fields.insert(key, messages);
        }
    }
    fields
}
