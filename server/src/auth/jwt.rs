//! Relay Credential Issuance
//!
//! Mints HS256 tokens that identify the relay to the automation backend.
//! Tokens are never verified here; that is the backend's job.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default credential lifetime.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 72;

/// Claims carried by a relay credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayClaims {
    /// Display name of the calling application.
    pub app_displayname: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// Token issuance failure.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token lifetime must be positive, got {0} hours")]
    InvalidLifetime(i64),

    #[error("failed to sign token")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Issues signed relay credentials with a fixed lifetime.
///
/// The key is supplied at construction; there is no process-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("key", &"[redacted]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenIssuer {
    /// Create an issuer signing with `secret`, valid for `ttl_hours`.
    pub fn new(secret: &[u8], ttl_hours: i64) -> Result<Self, TokenError> {
        if ttl_hours <= 0 {
            return Err(TokenError::InvalidLifetime(ttl_hours));
        }

        Ok(Self {
            key: EncodingKey::from_secret(secret),
            ttl: Duration::hours(ttl_hours),
        })
    }

    /// Mint a token for `display_name`. Every call produces a fresh token.
    pub fn issue(&self, display_name: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = RelayClaims {
            app_displayname: display_name.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.key)?)
    }
}
