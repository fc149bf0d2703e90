//! Refresh token model and DTOs.

use markethub_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A refresh token row from the `refresh_tokens` table.
///
/// Only the SHA-256 digest of the token string is stored.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: DbId,
    pub identity_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl RefreshToken {
    /// The persisted expiry is authoritative, regardless of what the token
    /// itself claims.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// DTO for persisting a freshly issued refresh token.
#[derive(Debug, Clone)]
pub struct CreateRefreshToken {
    pub identity_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
}
