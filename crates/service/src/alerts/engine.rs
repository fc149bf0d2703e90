//! Matching engine: fires eligible alerts against a batch of price ticks.

use std::sync::Arc;

use chrono::Utc;
use markethub_core::alert::{first_trigger, PriceTick};
use markethub_db::models::price_alert::PriceAlert;
use markethub_db::CredentialStore;
use serde::Serialize;

use crate::error::AppResult;

/// An alert this engine transitioned to triggered, with the price that did it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggeredAlert {
    pub alert: PriceAlert,
    pub matched_price: f64,
}

#[derive(Clone)]
pub struct AlertEngine {
    store: Arc<dyn CredentialStore>,
}

impl AlertEngine {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Evaluate every eligible alert against `ticks`.
    ///
    /// Each alert fires on the first tick, in input order, that satisfies it.
    /// The transition is a compare-and-set, so an alert another batch fired
    /// (or its owner deactivated) since loading is skipped. A store failure
    /// on one alert is logged and the rest of the batch still runs.
    pub async fn evaluate(&self, ticks: &[PriceTick]) -> AppResult<Vec<TriggeredAlert>> {
        if ticks.is_empty() {
            return Ok(Vec::new());
        }

        let eligible = self.store.list_active_untriggered_alerts().await?;
        let mut triggered = Vec::new();

        for alert in eligible {
            let Some(tick) =
                first_trigger(&alert.symbol, alert.condition, alert.target_price, ticks)
            else {
                continue;
            };

            match self.store.mark_alert_triggered(alert.id, Utc::now()).await {
                Ok(Some(updated)) => {
                    tracing::info!(
                        alert_id = updated.id,
                        identity_id = updated.identity_id,
                        symbol = %updated.symbol,
                        condition = %updated.condition,
                        target_price = updated.target_price,
                        matched_price = tick.price,
                        "Price alert triggered"
                    );
                    triggered.push(TriggeredAlert {
                        alert: updated,
                        matched_price: tick.price,
                    });
                }
                Ok(None) => {
                    tracing::debug!(alert_id = alert.id, "Alert no longer eligible, skipped");
                }
                Err(e) => {
                    tracing::error!(alert_id = alert.id, error = %e, "Failed to trigger alert");
                }
            }
        }

        Ok(triggered)
    }
}
