//! Periodic alert evaluation against a live price source.
//!
//! Each tick fetches the latest prices and hands them to the
//! [`AlertEngine`]. A failed fetch skips that tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::alerts::AlertEngine;
use crate::price_feed::PriceSource;

/// Run the evaluation loop until `cancel` is triggered.
pub async fn run(
    engine: AlertEngine,
    source: Arc<dyn PriceSource>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Alert evaluator started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Alert evaluator stopping");
                break;
            }
            _ = ticker.tick() => {
                evaluate_once(&engine, source.as_ref()).await;
            }
        }
    }
}

/// Fetch prices once and evaluate. Returns the number of alerts fired.
pub async fn evaluate_once(engine: &AlertEngine, source: &dyn PriceSource) -> usize {
    let ticks = match source.latest_prices().await {
        Ok(ticks) => ticks,
        Err(e) => {
            tracing::warn!(error = %e, "Alert evaluator: price fetch failed");
            return 0;
        }
    };

    match engine.evaluate(&ticks).await {
        Ok(triggered) => {
            if triggered.is_empty() {
                tracing::debug!(ticks = ticks.len(), "Alert evaluator: nothing triggered");
            } else {
                tracing::info!(count = triggered.len(), "Alert evaluator: alerts triggered");
            }
            triggered.len()
        }
        Err(e) => {
            tracing::error!(error = %e, "Alert evaluator: evaluation failed");
            0
        }
    }
}
