//! Owner-scoped alert management.

use std::sync::Arc;

use markethub_core::alert::{validate_symbol, validate_target_price, AlertCondition};
use markethub_core::error::CoreError;
use markethub_core::types::DbId;
use markethub_db::models::price_alert::{CreatePriceAlert, PriceAlert};
use markethub_db::CredentialStore;
use serde::Deserialize;

use crate::error::AppResult;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlertRequest {
    pub symbol: String,
    pub target_price: f64,
    pub condition: AlertCondition,
}

#[derive(Clone)]
pub struct AlertService {
    store: Arc<dyn CredentialStore>,
}

impl AlertService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Create an active alert. The symbol is stored uppercased.
    pub async fn create(&self, owner: DbId, input: &CreateAlertRequest) -> AppResult<PriceAlert> {
        let symbol = validate_symbol(&input.symbol)?;
        validate_target_price(input.target_price)?;

        let alert = self
            .store
            .create_alert(&CreatePriceAlert {
                identity_id: owner,
                symbol,
                target_price: input.target_price,
                condition: input.condition,
            })
            .await?;

        tracing::info!(
            alert_id = alert.id,
            identity_id = owner,
            symbol = %alert.symbol,
            "Price alert created"
        );
        Ok(alert)
    }

    /// The owner's alerts, newest first.
    pub async fn list(&self, owner: DbId) -> AppResult<Vec<PriceAlert>> {
        Ok(self.store.list_alerts_for_owner(owner).await?)
    }

    /// Flip `is_active`. A triggered alert stays triggered either way.
    pub async fn toggle(&self, owner: DbId, alert_id: DbId) -> AppResult<PriceAlert> {
        self.store
            .toggle_alert(alert_id, owner)
            .await?
            .ok_or_else(|| not_found(alert_id).into())
    }

    pub async fn delete(&self, owner: DbId, alert_id: DbId) -> AppResult<()> {
        if !self.store.delete_alert(alert_id, owner).await? {
            return Err(not_found(alert_id).into());
        }
        tracing::info!(alert_id, identity_id = owner, "Price alert deleted");
        Ok(())
    }
}

fn not_found(alert_id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "price_alert",
        id: alert_id,
    }
}
