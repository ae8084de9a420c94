//! API client error types.

use thiserror::Error;
use turbo_commerce::gateway::GatewayError;

/// Errors that can occur when calling the storefront API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Failed to send the request or read the response.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid base URL or path.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Non-success response. `message` is the server's own text.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Failed to parse response body.
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Http(e) if e.is_timeout())
    }

    /// Whether no response was received at all.
    pub fn is_connect(&self) -> bool {
        matches!(self, ApiError::Http(e) if e.is_connect())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Http(e) if e.is_timeout() => "The server did not respond in time".into(),
            ApiError::Http(e) if e.is_connect() => "Could not reach the server".into(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

impl From<ApiError> for GatewayError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Status { status, message } => GatewayError::Rejected { status, message },
            ApiError::Decode(message) => GatewayError::Decode(message),
            other => GatewayError::Transport(other.user_message()),
        }
    }
}
