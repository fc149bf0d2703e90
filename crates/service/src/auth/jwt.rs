//! JWT generation and validation for access and refresh tokens.
//!
//! Both token kinds are HS256-signed JWTs carrying a [`Claims`] payload; the
//! `token_use` claim keeps one from being accepted in place of the other.
//! Refresh tokens are additionally persisted by their SHA-256 digest so they
//! can be rotated and revoked.

use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use markethub_core::types::DbId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default access token expiry in minutes.
pub const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 60;
/// Default refresh token expiry in days.
pub const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// JWT claims embedded in every token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject -- the identity's internal database id.
    pub sub: DbId,
    pub email: String,
    /// Role name (`"user"` or `"admin"`).
    pub role: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4). Makes every refresh token digest
    /// distinct even when two are minted in the same second.
    pub jti: String,
    pub token_use: TokenUse,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 60).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    pub fn access_lifetime(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_mins)
    }

    pub fn refresh_lifetime(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }
}

/// Sign a token of the given use for an identity.
pub fn generate_token(
    identity_id: DbId,
    email: &str,
    role: &str,
    token_use: TokenUse,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let lifetime = match token_use {
        TokenUse::Access => config.access_lifetime(),
        TokenUse::Refresh => config.refresh_lifetime(),
    };
    let now = chrono::Utc::now().timestamp();

    let claims = Claims {
        sub: identity_id,
        email: email.to_string(),
        role: role.to_string(),
        exp: now + lifetime.num_seconds(),
        iat: now,
        jti: Uuid::new_v4().to_string(),
        token_use,
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate and decode a token, returning the embedded [`Claims`].
///
/// Checks signature and expiration. The caller checks `token_use`.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}
