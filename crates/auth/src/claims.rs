use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried by API access tokens.
///
/// `iat` and `exp` are optional: tokens without an expiry never expire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Identifier of the authenticated user.
    pub id: String,

    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Issued-at, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn new(id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            access_token: access_token.into(),
            refresh_token: None,
            iat: None,
            exp: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Stamp `iat = now` and `exp = now + ttl`.
    pub fn expires_in(mut self, now: DateTime<Utc>, ttl: Duration) -> Self {
        self.iat = Some(now.timestamp());
        self.exp = Some((now + ttl).timestamp());
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("no authorization header was found in the request")]
    MissingHeader,

    #[error("authorization header must be `Bearer <token>`")]
    MalformedHeader,

    #[error("authorization token is invalid: {0}")]
    Invalid(String),

    #[error("authorization token expired")]
    Expired,

    #[error("authorization token is not yet valid")]
    NotYetValid,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens in [`crate::jwt`]; this only checks `iat`/`exp`.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    let now = now.timestamp();

    if let (Some(iat), Some(exp)) = (claims.iat, claims.exp) {
        if exp <= iat {
            return Err(TokenError::Invalid("exp must be after iat".to_string()));
        }
    }
    if let Some(iat) = claims.iat {
        if now < iat {
            return Err(TokenError::NotYetValid);
        }
    }
    if let Some(exp) = claims.exp {
        if now >= exp {
            return Err(TokenError::Expired);
        }
    }
    Ok(())
}
