//! Repository for the `price_alerts` table.

use markethub_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::price_alert::{CreatePriceAlert, PriceAlert};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, identity_id, symbol, target_price, condition, is_active, \
                        triggered, triggered_at, created_at";

/// Provides CRUD operations and trigger transitions for price alerts.
pub struct PriceAlertRepo;

impl PriceAlertRepo {
    /// Insert a new alert (active, untriggered), returning the created row.
    pub async fn create(pool: &PgPool, input: &CreatePriceAlert) -> Result<PriceAlert, sqlx::Error> {
        let query = format!(
            "INSERT INTO price_alerts (identity_id, symbol, target_price, condition)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PriceAlert>(&query)
            .bind(input.identity_id)
            .bind(&input.symbol)
            .bind(input.target_price)
            .bind(input.condition.as_str())
            .fetch_one(pool)
            .await
    }

    /// List an owner's alerts, most recently created first.
    pub async fn list_for_owner(
        pool: &PgPool,
        identity_id: DbId,
    ) -> Result<Vec<PriceAlert>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM price_alerts
             WHERE identity_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, PriceAlert>(&query)
            .bind(identity_id)
            .fetch_all(pool)
            .await
    }

    /// List every alert the matching engine may fire.
    pub async fn list_active_untriggered(pool: &PgPool) -> Result<Vec<PriceAlert>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM price_alerts
             WHERE is_active = true AND triggered = false
             ORDER BY id"
        );
        sqlx::query_as::<_, PriceAlert>(&query).fetch_all(pool).await
    }

    /// Flip `is_active` on an owner's alert.
    ///
    /// Returns `None` if the alert does not exist or belongs to someone else.
    pub async fn toggle(
        pool: &PgPool,
        id: DbId,
        identity_id: DbId,
    ) -> Result<Option<PriceAlert>, sqlx::Error> {
        let query = format!(
            "UPDATE price_alerts SET is_active = NOT is_active
             WHERE id = $1 AND identity_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PriceAlert>(&query)
            .bind(id)
            .bind(identity_id)
            .fetch_optional(pool)
            .await
    }

    /// Transition an eligible alert to triggered.
    ///
    /// The `WHERE` guard makes this a compare-and-set: it returns `None` when
    /// the alert was already triggered, deactivated, or deleted.
    pub async fn mark_triggered(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<PriceAlert>, sqlx::Error> {
        let query = format!(
            "UPDATE price_alerts SET
                triggered = true,
                is_active = false,
                triggered_at = $2
             WHERE id = $1 AND is_active = true AND triggered = false
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PriceAlert>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Delete an owner's alert. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId, identity_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM price_alerts WHERE id = $1 AND identity_id = $2")
            .bind(id)
            .bind(identity_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
