//! Alert ownership operations, the matching engine, and the evaluator tick.

mod common;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use markethub_core::alert::{AlertCondition, PriceTick};
use markethub_core::error::CoreError;
use markethub_core::types::{DbId, Timestamp};
use markethub_db::models::identity::{CreateIdentity, Identity};
use markethub_db::models::price_alert::{CreatePriceAlert, PriceAlert};
use markethub_db::models::refresh_token::{CreateRefreshToken, RefreshToken};
use markethub_db::{CredentialStore, MemoryStore, StoreError, StoreResult};
use markethub_service::alerts::{AlertEngine, CreateAlertRequest};
use markethub_service::background::alert_evaluator;
use markethub_service::error::AppError;
use markethub_service::identity::RegisterRequest;
use markethub_service::price_feed::{PriceFeedError, PriceSource};
use markethub_service::state::AppState;

use common::{build_test_app, test_config, TestApp, TEST_PASSWORD};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn owner(app: &TestApp, email: &str) -> DbId {
    app.register(email).await.identity.id
}

async fn create(
    app: &TestApp,
    owner: DbId,
    symbol: &str,
    target_price: f64,
    condition: AlertCondition,
) -> PriceAlert {
    app.state
        .alerts
        .create(
            owner,
            &CreateAlertRequest {
                symbol: symbol.to_string(),
                target_price,
                condition,
            },
        )
        .await
        .expect("alert creation should succeed")
}

async fn reload(app: &TestApp, owner: DbId, id: DbId) -> PriceAlert {
    app.state
        .alerts
        .list(owner)
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.id == id)
        .expect("alert should exist")
}

struct StaticSource(Vec<PriceTick>);

#[async_trait]
impl PriceSource for StaticSource {
    async fn latest_prices(&self) -> Result<Vec<PriceTick>, PriceFeedError> {
        Ok(self.0.clone())
    }
}

struct FailingSource;

#[async_trait]
impl PriceSource for FailingSource {
    async fn latest_prices(&self) -> Result<Vec<PriceTick>, PriceFeedError> {
        Err(PriceFeedError::ApiError {
            status: 503,
            body: "unavailable".into(),
        })
    }
}

/// Delegates to a [`MemoryStore`], but the trigger transition for one alert
/// id fails with a database error.
struct FailingTriggerStore {
    inner: MemoryStore,
    fail_alert_id: AtomicI64,
}

#[async_trait]
impl CredentialStore for FailingTriggerStore {
    async fn find_identity_by_id(&self, id: DbId) -> StoreResult<Option<Identity>> {
        self.inner.find_identity_by_id(id).await
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        self.inner.find_identity_by_email(email).await
    }

    async fn find_identity_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> StoreResult<Option<Identity>> {
        self.inner.find_identity_by_provider(provider, provider_id).await
    }

    async fn create_identity(&self, input: &CreateIdentity) -> StoreResult<Identity> {
        self.inner.create_identity(input).await
    }

    async fn link_provider(
        &self,
        id: DbId,
        provider: &str,
        provider_id: &str,
    ) -> StoreResult<Option<Identity>> {
        self.inner.link_provider(id, provider, provider_id).await
    }

    async fn set_pending_two_factor(
        &self,
        id: DbId,
        secret: &str,
    ) -> StoreResult<Option<Identity>> {
        self.inner.set_pending_two_factor(id, secret).await
    }

    async fn enable_two_factor(&self, id: DbId, secret: &str) -> StoreResult<bool> {
        self.inner.enable_two_factor(id, secret).await
    }

    async fn disable_two_factor(&self, id: DbId, secret: &str) -> StoreResult<bool> {
        self.inner.disable_two_factor(id, secret).await
    }

    async fn create_refresh_token(&self, input: &CreateRefreshToken) -> StoreResult<RefreshToken> {
        self.inner.create_refresh_token(input).await
    }

    async fn find_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        self.inner.find_refresh_token(token_hash).await
    }

    async fn take_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        self.inner.take_refresh_token(token_hash).await
    }

    async fn delete_refresh_token(&self, id: DbId) -> StoreResult<bool> {
        self.inner.delete_refresh_token(id).await
    }

    async fn create_alert(&self, input: &CreatePriceAlert) -> StoreResult<PriceAlert> {
        self.inner.create_alert(input).await
    }

    async fn list_alerts_for_owner(&self, identity_id: DbId) -> StoreResult<Vec<PriceAlert>> {
        self.inner.list_alerts_for_owner(identity_id).await
    }

    async fn list_active_untriggered_alerts(&self) -> StoreResult<Vec<PriceAlert>> {
        self.inner.list_active_untriggered_alerts().await
    }

    async fn toggle_alert(&self, id: DbId, identity_id: DbId) -> StoreResult<Option<PriceAlert>> {
        self.inner.toggle_alert(id, identity_id).await
    }

    async fn mark_alert_triggered(
        &self,
        id: DbId,
        at: Timestamp,
    ) -> StoreResult<Option<PriceAlert>> {
        if id == self.fail_alert_id.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.mark_alert_triggered(id, at).await
    }

    async fn delete_alert(&self, id: DbId, identity_id: DbId) -> StoreResult<bool> {
        self.inner.delete_alert(id, identity_id).await
    }
}

// ---------------------------------------------------------------------------
// Ownership operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_normalizes_symbol() {
    let app = build_test_app();
    let me = owner(&app, "a@x.com").await;

    let alert = create(&app, me, " btc ", 50_000.0, AlertCondition::Above).await;
    assert_eq!(alert.symbol, "BTC");
    assert!(alert.is_active);
    assert!(!alert.triggered);
    assert!(alert.triggered_at.is_none());
}

#[tokio::test]
async fn test_create_validates_input() {
    let app = build_test_app();
    let me = owner(&app, "a@x.com").await;

    let cases = [("", 1.0), ("BTC-USD", 1.0), ("BTC", 0.0), ("BTC", -5.0), ("BTC", f64::NAN)];
    for (symbol, target_price) in cases {
        let result = app
            .state
            .alerts
            .create(
                me,
                &CreateAlertRequest {
                    symbol: symbol.to_string(),
                    target_price,
                    condition: AlertCondition::Below,
                },
            )
            .await;
        assert_matches!(result, Err(AppError::Core(CoreError::Validation(_))));
    }
}

#[tokio::test]
async fn test_list_is_newest_first_and_owner_scoped() {
    let app = build_test_app();
    let alice = owner(&app, "alice@x.com").await;
    let bob = owner(&app, "bob@x.com").await;

    let first = create(&app, alice, "BTC", 1.0, AlertCondition::Above).await;
    let second = create(&app, alice, "ETH", 1.0, AlertCondition::Above).await;
    create(&app, bob, "SOL", 1.0, AlertCondition::Above).await;

    let ids: Vec<DbId> = app
        .state
        .alerts
        .list(alice)
        .await
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_toggle_and_delete_require_ownership() {
    let app = build_test_app();
    let alice = owner(&app, "alice@x.com").await;
    let bob = owner(&app, "bob@x.com").await;
    let alert = create(&app, alice, "BTC", 1.0, AlertCondition::Above).await;

    let toggle = app.state.alerts.toggle(bob, alert.id).await;
    assert_matches!(toggle, Err(AppError::Core(CoreError::NotFound { .. })));
    let delete = app.state.alerts.delete(bob, alert.id).await;
    assert_matches!(delete, Err(AppError::Core(CoreError::NotFound { .. })));

    let toggled = app.state.alerts.toggle(alice, alert.id).await.unwrap();
    assert!(!toggled.is_active);
    let toggled = app.state.alerts.toggle(alice, alert.id).await.unwrap();
    assert!(toggled.is_active);

    app.state.alerts.delete(alice, alert.id).await.unwrap();
    assert!(app.state.alerts.list(alice).await.unwrap().is_empty());
    let again = app.state.alerts.delete(alice, alert.id).await;
    assert_matches!(again, Err(AppError::Core(CoreError::NotFound { .. })));
}

// ---------------------------------------------------------------------------
// Matching engine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_btc_above_triggers_once() {
    let app = build_test_app();
    let me = owner(&app, "a@x.com").await;
    let alert = create(&app, me, "BTC", 50_000.0, AlertCondition::Above).await;

    let fired = app
        .state
        .engine
        .evaluate(&[PriceTick::new("BTC", 50_000.0)])
        .await
        .unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].alert.id, alert.id);
    assert_eq!(fired[0].matched_price, 50_000.0);
    assert!(fired[0].alert.triggered);
    assert!(!fired[0].alert.is_active);
    assert!(fired[0].alert.triggered_at.is_some());

    let later = app
        .state
        .engine
        .evaluate(&[PriceTick::new("BTC", 51_000.0)])
        .await
        .unwrap();
    assert!(later.is_empty());

    let stored = reload(&app, me, alert.id).await;
    assert_eq!(stored.triggered_at, fired[0].alert.triggered_at);
}

#[tokio::test]
async fn test_thresholds_are_inclusive() {
    let app = build_test_app();
    let me = owner(&app, "a@x.com").await;
    let above = create(&app, me, "BTC", 100.0, AlertCondition::Above).await;
    let below = create(&app, me, "ETH", 10.0, AlertCondition::Below).await;

    let near_miss = app
        .state
        .engine
        .evaluate(&[
            PriceTick::new("BTC", 100.0 - 1e-9),
            PriceTick::new("ETH", 10.0 + 1e-9),
        ])
        .await
        .unwrap();
    assert!(near_miss.is_empty());

    let exact = app
        .state
        .engine
        .evaluate(&[PriceTick::new("BTC", 100.0), PriceTick::new("ETH", 10.0)])
        .await
        .unwrap();
    let mut ids: Vec<DbId> = exact.iter().map(|t| t.alert.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![above.id, below.id]);
}

#[tokio::test]
async fn test_first_matching_tick_wins() {
    let app = build_test_app();
    let me = owner(&app, "a@x.com").await;
    create(&app, me, "BTC", 100.0, AlertCondition::Above).await;

    let fired = app
        .state
        .engine
        .evaluate(&[
            PriceTick::new("btc", 90.0),
            PriceTick::new("ETH", 500.0),
            PriceTick::new("btc", 105.0),
            PriceTick::new("BTC", 120.0),
        ])
        .await
        .unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].matched_price, 105.0);
}

#[tokio::test]
async fn test_inactive_alert_is_ignored() {
    let app = build_test_app();
    let me = owner(&app, "a@x.com").await;
    let alert = create(&app, me, "BTC", 100.0, AlertCondition::Above).await;
    app.state.alerts.toggle(me, alert.id).await.unwrap();

    let fired = app
        .state
        .engine
        .evaluate(&[PriceTick::new("BTC", 200.0)])
        .await
        .unwrap();
    assert!(fired.is_empty());
    assert!(!reload(&app, me, alert.id).await.triggered);
}

#[tokio::test]
async fn test_toggle_never_rearms_triggered_alert() {
    let app = build_test_app();
    let me = owner(&app, "a@x.com").await;
    let alert = create(&app, me, "BTC", 100.0, AlertCondition::Above).await;
    app.state
        .engine
        .evaluate(&[PriceTick::new("BTC", 100.0)])
        .await
        .unwrap();

    let toggled = app.state.alerts.toggle(me, alert.id).await.unwrap();
    assert!(toggled.is_active);
    assert!(toggled.triggered);

    let fired = app
        .state
        .engine
        .evaluate(&[PriceTick::new("BTC", 150.0)])
        .await
        .unwrap();
    assert!(fired.is_empty());
    assert!(app.store.list_active_untriggered_alerts().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batches_fire_each_alert_once() {
    let app = build_test_app();
    let me = owner(&app, "a@x.com").await;
    for target in [100.0, 200.0, 300.0] {
        create(&app, me, "BTC", target, AlertCondition::Above).await;
    }

    let batches = (0..6).map(|_| {
        let engine = app.state.engine.clone();
        tokio::spawn(async move { engine.evaluate(&[PriceTick::new("BTC", 1_000.0)]).await })
    });
    let total: usize = futures::future::join_all(batches)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().len())
        .sum();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn test_failed_trigger_does_not_abort_the_batch() {
    let store = Arc::new(FailingTriggerStore {
        inner: MemoryStore::new(),
        fail_alert_id: AtomicI64::new(0),
    });
    let state = AppState::new(store.clone(), test_config());
    let me = state
        .identities
        .register(&RegisterRequest {
            email: "a@x.com".into(),
            password: TEST_PASSWORD.into(),
        })
        .await
        .unwrap()
        .identity
        .id;

    let mut ids = Vec::new();
    for symbol in ["BTC", "ETH", "SOL"] {
        let alert = state
            .alerts
            .create(
                me,
                &CreateAlertRequest {
                    symbol: symbol.to_string(),
                    target_price: 10.0,
                    condition: AlertCondition::Above,
                },
            )
            .await
            .unwrap();
        ids.push(alert.id);
    }
    store.fail_alert_id.store(ids[1], Ordering::SeqCst);

    let engine = AlertEngine::new(store.clone());
    let fired = engine
        .evaluate(&[
            PriceTick::new("BTC", 20.0),
            PriceTick::new("ETH", 20.0),
            PriceTick::new("SOL", 20.0),
        ])
        .await
        .expect("a single failed transition must not fail the batch");

    let mut fired_ids: Vec<DbId> = fired.iter().map(|t| t.alert.id).collect();
    fired_ids.sort_unstable();
    assert_eq!(fired_ids, vec![ids[0], ids[2]]);

    let remaining = store.inner.list_active_untriggered_alerts().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, ids[1]);
    assert!(remaining[0].is_eligible());
}

#[tokio::test]
async fn test_empty_batch_is_a_no_op() {
    let app = build_test_app();
    let me = owner(&app, "a@x.com").await;
    create(&app, me, "BTC", 100.0, AlertCondition::Above).await;

    assert!(app.state.engine.evaluate(&[]).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Evaluator tick
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_evaluator_tick_uses_source_prices() {
    let app = build_test_app();
    let me = owner(&app, "a@x.com").await;
    create(&app, me, "ETH", 3_000.0, AlertCondition::Below).await;

    let source: Arc<dyn PriceSource> = Arc::new(StaticSource(vec![PriceTick::new("ETH", 2_950.0)]));
    let fired = alert_evaluator::evaluate_once(&app.state.engine, source.as_ref()).await;
    assert_eq!(fired, 1);

    let fired_again = alert_evaluator::evaluate_once(&app.state.engine, source.as_ref()).await;
    assert_eq!(fired_again, 0);
}

#[tokio::test]
async fn test_evaluator_skips_tick_on_feed_error() {
    let app = build_test_app();
    let me = owner(&app, "a@x.com").await;
    let alert = create(&app, me, "ETH", 3_000.0, AlertCondition::Below).await;

    let fired = alert_evaluator::evaluate_once(&app.state.engine, &FailingSource).await;
    assert_eq!(fired, 0);
    assert!(reload(&app, me, alert.id).await.is_eligible());
}

#[tokio::test]
async fn test_evaluator_stops_on_cancel() {
    let app = build_test_app();
    let cancel = tokio_util::sync::CancellationToken::new();
    let handle = tokio::spawn(alert_evaluator::run(
        app.state.engine.clone(),
        Arc::new(StaticSource(Vec::new())),
        std::time::Duration::from_millis(10),
        cancel.clone(),
    ));

    cancel.cancel();
    tokio::time::timeout(std::time::Duration::from_secs(1), handle)
        .await
        .expect("evaluator should stop promptly")
        .unwrap();
}
