//! Bearer token issuance and verification (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::AuthConfig;
use crate::constants::auth::{GENERATED_SECRET_BYTES, MAX_TOKEN_TTL_HOURS};
use crate::domain::UserId;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: UserId,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Identity carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &[u8], ttl_hours: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(i64::try_from(ttl_hours.min(MAX_TOKEN_TTL_HOURS)).unwrap_or(24)),
        }
    }

    /// Builds the service from config, generating a throwaway secret when
    /// none is configured.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        match config.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Self::new(secret.as_bytes(), config.token_ttl_hours),
            _ => {
                warn!(
                    "No JWT secret configured (auth.jwt_secret / JWT_SECRET); using a random \
                     per-process secret. Issued tokens will not survive a restart"
                );
                let secret: [u8; GENERATED_SECRET_BYTES] = rand::rng().random();
                Self::new(&secret, config.token_ttl_hours)
            }
        }
    }

    pub fn issue(&self, id: UserId, username: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        Ok(AuthUser {
            id: data.claims.id,
            username: data.claims.username,
        })
    }
}
