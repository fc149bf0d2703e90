use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use markethub_db::PgStore;
use markethub_service::background::alert_evaluator;
use markethub_service::config::ServiceConfig;
use markethub_service::price_feed::BinanceSource;
use markethub_service::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "markethub_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServiceConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        access_expiry_mins = config.jwt.access_token_expiry_mins,
        alert_interval_secs = config.alert_eval_interval_secs,
        "Loaded service configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = markethub_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    markethub_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    markethub_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- App state ---
    let source = Arc::new(BinanceSource::new(
        config.price_feed_url.clone(),
        config.price_quote_asset.clone(),
    ));
    let interval = Duration::from_secs(config.alert_eval_interval_secs.max(1));
    let state = AppState::new(Arc::new(PgStore::new(pool)), config);

    // --- Alert evaluator ---
    let cancel = CancellationToken::new();
    let evaluator_handle = tokio::spawn(alert_evaluator::run(
        state.engine.clone(),
        source,
        interval,
        cancel.clone(),
    ));

    tracing::info!("Service running, waiting for shutdown signal");
    shutdown_signal().await;

    // --- Shutdown ---
    cancel.cancel();
    if tokio::time::timeout(Duration::from_secs(5), evaluator_handle)
        .await
        .is_err()
    {
        tracing::warn!("Alert evaluator did not stop within 5s");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
