//! Error types for lockbridge

use thiserror::Error;

/// Main error type for lockbridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("TTLock API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Cannot refresh token: {0}")]
    AuthRefreshFailed(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// True when the stored credentials can no longer mint tokens
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, BridgeError::AuthRefreshFailed(_) | BridgeError::AuthError(_))
    }
}

impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        BridgeError::Internal(err.to_string())
    }
}
