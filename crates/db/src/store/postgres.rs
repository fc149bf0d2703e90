//! PostgreSQL-backed [`CredentialStore`].

use async_trait::async_trait;
use markethub_core::types::{DbId, Timestamp};

use super::{CredentialStore, StoreResult};
use crate::models::identity::{CreateIdentity, Identity};
use crate::models::price_alert::{CreatePriceAlert, PriceAlert};
use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};
use crate::repositories::{IdentityRepo, PriceAlertRepo, RefreshTokenRepo};
use crate::DbPool;

/// Store adapter delegating to the repositories over a shared pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_identity_by_id(&self, id: DbId) -> StoreResult<Option<Identity>> {
        Ok(IdentityRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        Ok(IdentityRepo::find_by_email(&self.pool, email).await?)
    }

    async fn find_identity_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> StoreResult<Option<Identity>> {
        Ok(IdentityRepo::find_by_provider(&self.pool, provider, provider_id).await?)
    }

    async fn create_identity(&self, input: &CreateIdentity) -> StoreResult<Identity> {
        Ok(IdentityRepo::create(&self.pool, input).await?)
    }

    async fn link_provider(
        &self,
        id: DbId,
        provider: &str,
        provider_id: &str,
    ) -> StoreResult<Option<Identity>> {
        Ok(IdentityRepo::link_provider(&self.pool, id, provider, provider_id).await?)
    }

    async fn set_pending_two_factor(
        &self,
        id: DbId,
        secret: &str,
    ) -> StoreResult<Option<Identity>> {
        Ok(IdentityRepo::set_pending_two_factor(&self.pool, id, secret).await?)
    }

    async fn enable_two_factor(&self, id: DbId, secret: &str) -> StoreResult<bool> {
        Ok(IdentityRepo::enable_two_factor(&self.pool, id, secret).await?)
    }

    async fn disable_two_factor(&self, id: DbId, secret: &str) -> StoreResult<bool> {
        Ok(IdentityRepo::disable_two_factor(&self.pool, id, secret).await?)
    }

    async fn create_refresh_token(&self, input: &CreateRefreshToken) -> StoreResult<RefreshToken> {
        Ok(RefreshTokenRepo::create(&self.pool, input).await?)
    }

    async fn find_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        Ok(RefreshTokenRepo::find_by_token_hash(&self.pool, token_hash).await?)
    }

    async fn take_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        Ok(RefreshTokenRepo::take_by_token_hash(&self.pool, token_hash).await?)
    }

    async fn delete_refresh_token(&self, id: DbId) -> StoreResult<bool> {
        Ok(RefreshTokenRepo::delete(&self.pool, id).await?)
    }

    async fn create_alert(&self, input: &CreatePriceAlert) -> StoreResult<PriceAlert> {
        Ok(PriceAlertRepo::create(&self.pool, input).await?)
    }

    async fn list_alerts_for_owner(&self, identity_id: DbId) -> StoreResult<Vec<PriceAlert>> {
        Ok(PriceAlertRepo::list_for_owner(&self.pool, identity_id).await?)
    }

    async fn list_active_untriggered_alerts(&self) -> StoreResult<Vec<PriceAlert>> {
        Ok(PriceAlertRepo::list_active_untriggered(&self.pool).await?)
    }

    async fn toggle_alert(&self, id: DbId, identity_id: DbId) -> StoreResult<Option<PriceAlert>> {
        Ok(PriceAlertRepo::toggle(&self.pool, id, identity_id).await?)
    }

    async fn mark_alert_triggered(
        &self,
        id: DbId,
        at: Timestamp,
    ) -> StoreResult<Option<PriceAlert>> {
        Ok(PriceAlertRepo::mark_triggered(&self.pool, id, at).await?)
    }

    async fn delete_alert(&self, id: DbId, identity_id: DbId) -> StoreResult<bool> {
        Ok(PriceAlertRepo::delete(&self.pool, id, identity_id).await?)
    }
}
