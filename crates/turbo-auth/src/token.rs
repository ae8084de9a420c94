//! Bearer tokens issued by the login endpoint.
//!
//! The client never verifies a token. It only reads the `exp` claim of a
//! JWT-shaped token so an expired session is not restored.

use crate::AuthError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// An opaque bearer token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken {
    value: String,
    pub issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    /// Wrap a token string received now.
    pub fn new(value: impl Into<String>) -> Result<Self, AuthError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(AuthError::InvalidToken("empty token".into()));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidToken("token contains whitespace".into()));
        }
        let expires_at = jwt_expiry(&value);
        Ok(Self {
            value,
            issued_at: Utc::now(),
            expires_at,
        })
    }

    /// Override the expiry, e.g. from an `expiresIn` login field.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Value for an `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.value)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Validate the token.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.is_expired() {
            return Err(AuthError::TokenExpired);
        }
        Ok(())
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("value", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// `exp` of a `header.payload.signature` token, if it has one.
fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_, payload, _) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    Utc.timestamp_opt(claims.exp?, 0).single()
}
