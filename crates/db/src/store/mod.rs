//! The credential store adapter.
//!
//! Services talk to storage only through [`CredentialStore`]. Every method is
//! a single atomic request; conditional updates (`link_provider`,
//! `enable_two_factor`, `take_refresh_token`, `mark_alert_triggered`, ...)
//! carry their guard inside that request so callers never need a
//! read-then-write sequence to stay correct under concurrency.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use markethub_core::types::{DbId, Timestamp};

use crate::models::identity::{CreateIdentity, Identity};
use crate::models::price_alert::{CreatePriceAlert, PriceAlert};
use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Unique constraint names, shared by both implementations.
pub mod constraints {
    pub const IDENTITY_EMAIL: &str = "uq_identities_email";
    pub const IDENTITY_PROVIDER: &str = "uq_identities_provider";
    pub const REFRESH_TOKEN_HASH: &str = "uq_refresh_tokens_token_hash";
}

/// PostgreSQL SQLSTATE for unique violations.
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL SQLSTATE for check constraint violations.
const CHECK_VIOLATION: &str = "23514";
/// PostgreSQL SQLSTATE for foreign key violations.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Errors raised by a [`CredentialStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    Conflict { constraint: String },

    /// A check or foreign key constraint rejected the write.
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Whether this is a unique violation on the named constraint.
    pub fn is_conflict_on(&self, name: &str) -> bool {
        matches!(self, StoreError::Conflict { constraint } if constraint == name)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return StoreError::Conflict {
                        constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                    };
                }
                Some(CHECK_VIOLATION) | Some(FOREIGN_KEY_VIOLATION) => {
                    return StoreError::Rejected(
                        db_err.constraint().unwrap_or("unknown").to_string(),
                    );
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable records for identities, refresh tokens, and price alerts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    // -- Identities ---------------------------------------------------------

    /// Get an identity by ID.
    async fn find_identity_by_id(&self, id: DbId) -> StoreResult<Option<Identity>>;

    /// Get an identity by exact email.
    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>>;

    /// Get an identity by linked provider identity.
    async fn find_identity_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> StoreResult<Option<Identity>>;

    /// Create an identity. Fails with [`StoreError::Conflict`] on a taken
    /// email or provider identity.
    async fn create_identity(&self, input: &CreateIdentity) -> StoreResult<Identity>;

    /// Attach a provider and mark verified, only while no provider is linked.
    async fn link_provider(
        &self,
        id: DbId,
        provider: &str,
        provider_id: &str,
    ) -> StoreResult<Option<Identity>>;

    /// Store a pending 2FA secret unless 2FA is already enabled.
    async fn set_pending_two_factor(&self, id: DbId, secret: &str)
        -> StoreResult<Option<Identity>>;

    /// Enable 2FA if the stored secret is still `secret`.
    async fn enable_two_factor(&self, id: DbId, secret: &str) -> StoreResult<bool>;

    /// Disable 2FA and clear the secret if enabled with `secret`.
    async fn disable_two_factor(&self, id: DbId, secret: &str) -> StoreResult<bool>;

    // -- Refresh tokens -----------------------------------------------------

    /// Persist a refresh token record.
    async fn create_refresh_token(&self, input: &CreateRefreshToken) -> StoreResult<RefreshToken>;

    /// Look up a refresh token record by digest without consuming it.
    async fn find_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>>;

    /// Remove and return the record with this digest, if any.
    ///
    /// Concurrent calls for the same digest yield the record to exactly one
    /// caller.
    async fn take_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>>;

    /// Delete a refresh token record by ID.
    async fn delete_refresh_token(&self, id: DbId) -> StoreResult<bool>;

    // -- Price alerts -------------------------------------------------------

    /// Create an active, untriggered alert.
    async fn create_alert(&self, input: &CreatePriceAlert) -> StoreResult<PriceAlert>;

    /// An owner's alerts, newest first.
    async fn list_alerts_for_owner(&self, identity_id: DbId) -> StoreResult<Vec<PriceAlert>>;

    /// Every alert with `is_active AND NOT triggered`.
    async fn list_active_untriggered_alerts(&self) -> StoreResult<Vec<PriceAlert>>;

    /// Flip `is_active` on an owner's alert.
    async fn toggle_alert(&self, id: DbId, identity_id: DbId) -> StoreResult<Option<PriceAlert>>;

    /// Compare-and-set an eligible alert to triggered at `at`.
    async fn mark_alert_triggered(&self, id: DbId, at: Timestamp)
        -> StoreResult<Option<PriceAlert>>;

    /// Delete an owner's alert.
    async fn delete_alert(&self, id: DbId, identity_id: DbId) -> StoreResult<bool>;
}
