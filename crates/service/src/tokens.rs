//! Session token issuance, rotation, and revocation.

use std::sync::Arc;

use chrono::Utc;
use markethub_core::error::CoreError;
use markethub_core::hashing::sha256_hex;
use markethub_core::roles::Role;
use markethub_core::types::DbId;
use markethub_db::models::refresh_token::CreateRefreshToken;
use markethub_db::CredentialStore;
use serde::Serialize;

use crate::auth::jwt::{generate_token, validate_token, Claims, JwtConfig, TokenUse};
use crate::error::{AppError, AppResult};

/// An access token plus the refresh token that can replace it.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Mints token pairs and owns the single-use refresh token records.
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn CredentialStore>,
    config: JwtConfig,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn CredentialStore>, config: JwtConfig) -> Self {
        Self { store, config }
    }

    /// Sign a new pair and persist the refresh token's digest.
    ///
    /// The record's expiry is fixed here and is authoritative on redemption.
    pub async fn issue(&self, identity_id: DbId, email: &str, role: Role) -> AppResult<TokenPair> {
        let access_token =
            generate_token(identity_id, email, role.as_str(), TokenUse::Access, &self.config)
                .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
        let refresh_token =
            generate_token(identity_id, email, role.as_str(), TokenUse::Refresh, &self.config)
                .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

        let input = CreateRefreshToken {
            identity_id,
            token_hash: sha256_hex(refresh_token.as_bytes()),
            expires_at: Utc::now() + self.config.refresh_lifetime(),
        };
        self.store.create_refresh_token(&input).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_lifetime().num_seconds(),
        })
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// The record is removed before anything else happens, so of several
    /// concurrent redemptions of one token at most one gets past the take.
    pub async fn redeem(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let token_hash = sha256_hex(refresh_token.as_bytes());

        let record = self
            .store
            .take_refresh_token(&token_hash)
            .await?
            .ok_or(CoreError::InvalidOrExpired)?;

        if record.is_expired(Utc::now()) {
            tracing::info!(identity_id = record.identity_id, "Expired refresh token presented");
            return Err(CoreError::InvalidOrExpired.into());
        }

        let identity = self
            .store
            .find_identity_by_id(record.identity_id)
            .await?
            .ok_or(CoreError::InvalidOrExpired)?;

        let pair = self.issue(identity.id, &identity.email, identity.role).await?;
        tracing::info!(identity_id = identity.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Delete a refresh token owned by `identity_id`.
    ///
    /// Unknown tokens and tokens of other identities are ignored.
    pub async fn revoke(&self, identity_id: DbId, refresh_token: &str) -> AppResult<()> {
        let token_hash = sha256_hex(refresh_token.as_bytes());
        match self.store.find_refresh_token(&token_hash).await? {
            Some(record) if record.identity_id == identity_id => {
                self.store.delete_refresh_token(record.id).await?;
                tracing::info!(identity_id, "Refresh token revoked");
            }
            Some(_) => {
                tracing::warn!(identity_id, "Refusing to revoke a foreign refresh token");
            }
            None => {}
        }
        Ok(())
    }

    /// Validate an access token for the routing layer.
    pub fn verify_access(&self, access_token: &str) -> AppResult<Claims> {
        let claims =
            validate_token(access_token, &self.config).map_err(|_| CoreError::InvalidOrExpired)?;
        if claims.token_use != TokenUse::Access {
            return Err(CoreError::InvalidOrExpired.into());
        }
        Ok(claims)
    }
}
