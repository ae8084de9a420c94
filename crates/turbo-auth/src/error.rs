//! Authentication errors.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No user is logged in.
    #[error("not logged in")]
    NotAuthenticated,

    /// Username missing or blank.
    #[error("invalid username: {0:?}")]
    InvalidUsername(String),

    /// Token missing or malformed.
    #[error("token invalid: {0}")]
    InvalidToken(String),

    /// Token expired.
    #[error("token expired")]
    TokenExpired,

    /// Cache error.
    #[error("cache error: {0}")]
    Cache(#[from] turbo_cache::CacheError),
}

impl AuthError {
    /// Check if this is an authentication failure.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated | AuthError::InvalidToken(_) | AuthError::TokenExpired
        )
    }
}
