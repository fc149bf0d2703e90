//! Repository for the `identities` table.

use markethub_core::types::DbId;
use sqlx::PgPool;

use crate::models::identity::{CreateIdentity, Identity};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, password_hash, oauth_provider, oauth_id, role, is_verified, \
                        two_factor_enabled, two_factor_secret, created_at, updated_at";

/// Provides CRUD operations for identities.
pub struct IdentityRepo;

impl IdentityRepo {
    /// Insert a new identity, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateIdentity) -> Result<Identity, sqlx::Error> {
        let query = format!(
            "INSERT INTO identities (email, password_hash, oauth_provider, oauth_id, role, is_verified)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Identity>(&query)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.oauth_provider)
            .bind(&input.oauth_id)
            .bind(input.role.as_str())
            .bind(input.is_verified)
            .fetch_one(pool)
            .await
    }

    /// Find an identity by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Identity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM identities WHERE id = $1");
        sqlx::query_as::<_, Identity>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an identity by email (case-sensitive, as stored).
    pub async fn find_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<Identity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM identities WHERE email = $1");
        sqlx::query_as::<_, Identity>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Find an identity by its linked external provider identity.
    pub async fn find_by_provider(
        pool: &PgPool,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<Identity>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM identities WHERE oauth_provider = $1 AND oauth_id = $2");
        sqlx::query_as::<_, Identity>(&query)
            .bind(provider)
            .bind(provider_id)
            .fetch_optional(pool)
            .await
    }

    /// Attach a provider identity and mark the identity verified.
    ///
    /// Only applies while no provider is linked. Returns `None` if the row is
    /// missing or already linked.
    pub async fn link_provider(
        pool: &PgPool,
        id: DbId,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<Identity>, sqlx::Error> {
        let query = format!(
            "UPDATE identities SET
                oauth_provider = $2,
                oauth_id = $3,
                is_verified = true,
                updated_at = NOW()
             WHERE id = $1 AND oauth_provider IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Identity>(&query)
            .bind(id)
            .bind(provider)
            .bind(provider_id)
            .fetch_optional(pool)
            .await
    }

    /// Store a pending 2FA secret, leaving 2FA disabled.
    ///
    /// Returns `None` if the row is missing or 2FA is already enabled.
    pub async fn set_pending_two_factor(
        pool: &PgPool,
        id: DbId,
        secret: &str,
    ) -> Result<Option<Identity>, sqlx::Error> {
        let query = format!(
            "UPDATE identities SET
                two_factor_secret = $2,
                two_factor_enabled = false,
                updated_at = NOW()
             WHERE id = $1 AND two_factor_enabled = false
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Identity>(&query)
            .bind(id)
            .bind(secret)
            .fetch_optional(pool)
            .await
    }

    /// Enable 2FA if the stored secret is still `secret`. Returns `true` if
    /// the row was updated.
    pub async fn enable_two_factor(
        pool: &PgPool,
        id: DbId,
        secret: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE identities SET two_factor_enabled = true, updated_at = NOW()
             WHERE id = $1 AND two_factor_secret = $2",
        )
        .bind(id)
        .bind(secret)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Disable 2FA and clear the secret if it is enabled with `secret`.
    /// Returns `true` if the row was updated.
    pub async fn disable_two_factor(
        pool: &PgPool,
        id: DbId,
        secret: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE identities SET
                two_factor_enabled = false,
                two_factor_secret = NULL,
                updated_at = NOW()
             WHERE id = $1 AND two_factor_enabled = true AND two_factor_secret = $2",
        )
        .bind(id)
        .bind(secret)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
