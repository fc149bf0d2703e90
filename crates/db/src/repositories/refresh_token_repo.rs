//! Repository for the `refresh_tokens` table.

use markethub_core::types::DbId;
use sqlx::PgPool;

use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, identity_id, token_hash, expires_at, created_at";

/// Provides CRUD operations for refresh tokens.
pub struct RefreshTokenRepo;

impl RefreshTokenRepo {
    /// Insert a new refresh token, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateRefreshToken,
    ) -> Result<RefreshToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO refresh_tokens (identity_id, token_hash, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(input.identity_id)
            .bind(&input.token_hash)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find a refresh token by its digest. Expired rows are returned too;
    /// callers check expiry.
    pub async fn find_by_token_hash(
        pool: &PgPool,
        hash: &str,
    ) -> Result<Option<RefreshToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM refresh_tokens WHERE token_hash = $1");
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Delete the row with the given digest and return it.
    ///
    /// A single `DELETE ... RETURNING` statement: of any number of concurrent
    /// callers presenting the same digest, exactly one receives the row.
    pub async fn take_by_token_hash(
        pool: &PgPool,
        hash: &str,
    ) -> Result<Option<RefreshToken>, sqlx::Error> {
        let query = format!("DELETE FROM refresh_tokens WHERE token_hash = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Delete a single refresh token. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
