use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::config::SecurityConfig;
use crate::database::{Role, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Ten years.
pub const MAX_TOKEN_HOURS: u64 = 24 * 365 * 10;

fn token_lifetime(hours: u64) -> Result<Duration, AuthError> {
    if hours == 0 || hours > MAX_TOKEN_HOURS {
        return Err(AuthError::InvalidTokenLifetime(hours));
    }
    i64::try_from(hours)
        .ok()
        .and_then(Duration::try_hours)
        .ok_or(AuthError::InvalidTokenLifetime(hours))
}

/// Signing and verification keys derived from the shared HS256 secret.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self, AuthError> {
        Self::new(&config.jwt_secret, token_lifetime(config.jwt_expiry_hours)?)
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    /// Issue a token with an explicit `iat` (seconds since epoch).
    pub fn issue_at(&self, user: &User, issued_at: i64) -> Result<IssuedToken, AuthError> {
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: issued_at,
            exp: issued_at + self.ttl.num_seconds(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_in: self.ttl.num_seconds(),
        })
    }

    /// Check signature and expiry. Every failure is `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                AuthError::InvalidToken
            })
    }
}
