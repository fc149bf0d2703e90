//! Price alert model and DTOs.

use markethub_core::alert::AlertCondition;
use markethub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A price alert row from the `price_alerts` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PriceAlert {
    pub id: DbId,
    pub identity_id: DbId,
    /// Always uppercase.
    pub symbol: String,
    pub target_price: f64,
    #[sqlx(try_from = "String")]
    pub condition: AlertCondition,
    pub is_active: bool,
    /// Once true, never reverts.
    pub triggered: bool,
    pub triggered_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl PriceAlert {
    /// Whether the matching engine may consider this alert.
    pub fn is_eligible(&self) -> bool {
        self.is_active && !self.triggered
    }
}

/// DTO for creating a new alert. `symbol` must already be normalized.
#[derive(Debug, Clone)]
pub struct CreatePriceAlert {
    pub identity_id: DbId,
    pub symbol: String,
    pub target_price: f64,
    pub condition: AlertCondition,
}
