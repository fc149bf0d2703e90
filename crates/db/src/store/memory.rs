//! In-memory [`CredentialStore`] for tests and local runs.
//!
//! All tables sit behind one async mutex, so each method observes and mutates
//! a consistent snapshot, matching the single-statement guards of the
//! PostgreSQL implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use markethub_core::types::{DbId, Timestamp};
use tokio::sync::Mutex;

use super::{constraints, CredentialStore, StoreError, StoreResult};
use crate::models::identity::{CreateIdentity, Identity};
use crate::models::price_alert::{CreatePriceAlert, PriceAlert};
use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};

#[derive(Default)]
struct Tables {
    identities: BTreeMap<DbId, Identity>,
    refresh_tokens: BTreeMap<DbId, RefreshToken>,
    alerts: BTreeMap<DbId, PriceAlert>,
    next_id: DbId,
}

impl Tables {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn conflict(name: &str) -> StoreError {
        StoreError::Conflict {
            constraint: name.to_string(),
        }
    }

    fn require_identity(&self, id: DbId) -> StoreResult<()> {
        if self.identities.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::Rejected("identity_id_fkey".into()))
        }
    }
}

/// Store backed by process memory. Data is lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored refresh token records.
    pub async fn refresh_token_count(&self) -> usize {
        self.tables.lock().await.refresh_tokens.len()
    }

    /// Overwrite a stored refresh token's expiry.
    pub async fn set_refresh_token_expiry(&self, token_hash: &str, expires_at: Timestamp) -> bool {
        let mut tables = self.tables.lock().await;
        match tables
            .refresh_tokens
            .values_mut()
            .find(|t| t.token_hash == token_hash)
        {
            Some(token) => {
                token.expires_at = expires_at;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_identity_by_id(&self, id: DbId) -> StoreResult<Option<Identity>> {
        Ok(self.tables.lock().await.identities.get(&id).cloned())
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .identities
            .values()
            .find(|i| i.email == email)
            .cloned())
    }

    async fn find_identity_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> StoreResult<Option<Identity>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .identities
            .values()
            .find(|i| {
                i.oauth_provider.as_deref() == Some(provider)
                    && i.oauth_id.as_deref() == Some(provider_id)
            })
            .cloned())
    }

    async fn create_identity(&self, input: &CreateIdentity) -> StoreResult<Identity> {
        if input.oauth_provider.is_some() != input.oauth_id.is_some() {
            return Err(StoreError::Rejected("ck_identities_provider_pair".into()));
        }
        if input.password_hash.is_none() && input.oauth_provider.is_none() {
            return Err(StoreError::Rejected("ck_identities_has_credential".into()));
        }

        let mut tables = self.tables.lock().await;
        if tables.identities.values().any(|i| i.email == input.email) {
            return Err(Tables::conflict(constraints::IDENTITY_EMAIL));
        }
        if let (Some(provider), Some(provider_id)) = (&input.oauth_provider, &input.oauth_id) {
            let taken = tables.identities.values().any(|i| {
                i.oauth_provider.as_ref() == Some(provider) && i.oauth_id.as_ref() == Some(provider_id)
            });
            if taken {
                return Err(Tables::conflict(constraints::IDENTITY_PROVIDER));
            }
        }

        let now = Utc::now();
        let identity = Identity {
            id: tables.next_id(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            oauth_provider: input.oauth_provider.clone(),
            oauth_id: input.oauth_id.clone(),
            role: input.role,
            is_verified: input.is_verified,
            two_factor_enabled: false,
            two_factor_secret: None,
            created_at: now,
            updated_at: now,
        };
        tables.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn link_provider(
        &self,
        id: DbId,
        provider: &str,
        provider_id: &str,
    ) -> StoreResult<Option<Identity>> {
        let mut tables = self.tables.lock().await;
        let taken = tables.identities.values().any(|i| {
            i.id != id
                && i.oauth_provider.as_deref() == Some(provider)
                && i.oauth_id.as_deref() == Some(provider_id)
        });

        let Some(identity) = tables.identities.get_mut(&id) else {
            return Ok(None);
        };
        if identity.oauth_provider.is_some() {
            return Ok(None);
        }
        if taken {
            return Err(Tables::conflict(constraints::IDENTITY_PROVIDER));
        }

        identity.oauth_provider = Some(provider.to_string());
        identity.oauth_id = Some(provider_id.to_string());
        identity.is_verified = true;
        identity.updated_at = Utc::now();
        Ok(Some(identity.clone()))
    }

    async fn set_pending_two_factor(
        &self,
        id: DbId,
        secret: &str,
    ) -> StoreResult<Option<Identity>> {
        let mut tables = self.tables.lock().await;
        match tables.identities.get_mut(&id) {
            Some(identity) if !identity.two_factor_enabled => {
                identity.two_factor_secret = Some(secret.to_string());
                identity.updated_at = Utc::now();
                Ok(Some(identity.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn enable_two_factor(&self, id: DbId, secret: &str) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.identities.get_mut(&id) {
            Some(identity) if identity.two_factor_secret.as_deref() == Some(secret) => {
                identity.two_factor_enabled = true;
                identity.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn disable_two_factor(&self, id: DbId, secret: &str) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.identities.get_mut(&id) {
            Some(identity)
                if identity.two_factor_enabled
                    && identity.two_factor_secret.as_deref() == Some(secret) =>
            {
                identity.two_factor_enabled = false;
                identity.two_factor_secret = None;
                identity.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_refresh_token(&self, input: &CreateRefreshToken) -> StoreResult<RefreshToken> {
        let mut tables = self.tables.lock().await;
        tables.require_identity(input.identity_id)?;
        if tables
            .refresh_tokens
            .values()
            .any(|t| t.token_hash == input.token_hash)
        {
            return Err(Tables::conflict(constraints::REFRESH_TOKEN_HASH));
        }

        let token = RefreshToken {
            id: tables.next_id(),
            identity_id: input.identity_id,
            token_hash: input.token_hash.clone(),
            expires_at: input.expires_at,
            created_at: Utc::now(),
        };
        tables.refresh_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn take_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        let mut tables = self.tables.lock().await;
        let id = tables
            .refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .map(|t| t.id);
        Ok(id.and_then(|id| tables.refresh_tokens.remove(&id)))
    }

    async fn delete_refresh_token(&self, id: DbId) -> StoreResult<bool> {
        Ok(self.tables.lock().await.refresh_tokens.remove(&id).is_some())
    }

    async fn create_alert(&self, input: &CreatePriceAlert) -> StoreResult<PriceAlert> {
        if input.target_price.is_nan() || input.target_price <= 0.0 {
            return Err(StoreError::Rejected("ck_price_alerts_target_positive".into()));
        }
        if input.symbol != input.symbol.to_uppercase() {
            return Err(StoreError::Rejected("ck_price_alerts_symbol_upper".into()));
        }

        let mut tables = self.tables.lock().await;
        tables.require_identity(input.identity_id)?;
        let alert = PriceAlert {
            id: tables.next_id(),
            identity_id: input.identity_id,
            symbol: input.symbol.clone(),
            target_price: input.target_price,
            condition: input.condition,
            is_active: true,
            triggered: false,
            triggered_at: None,
            created_at: Utc::now(),
        };
        tables.alerts.insert(alert.id, alert.clone());
        Ok(alert)
    }

    async fn list_alerts_for_owner(&self, identity_id: DbId) -> StoreResult<Vec<PriceAlert>> {
        let tables = self.tables.lock().await;
        let mut alerts: Vec<PriceAlert> = tables
            .alerts
            .values()
            .filter(|a| a.identity_id == identity_id)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(alerts)
    }

    async fn list_active_untriggered_alerts(&self) -> StoreResult<Vec<PriceAlert>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .alerts
            .values()
            .filter(|a| a.is_eligible())
            .cloned()
            .collect())
    }

    async fn toggle_alert(&self, id: DbId, identity_id: DbId) -> StoreResult<Option<PriceAlert>> {
        let mut tables = self.tables.lock().await;
        match tables.alerts.get_mut(&id) {
            Some(alert) if alert.identity_id == identity_id => {
                alert.is_active = !alert.is_active;
                Ok(Some(alert.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_alert_triggered(
        &self,
        id: DbId,
        at: Timestamp,
    ) -> StoreResult<Option<PriceAlert>> {
        let mut tables = self.tables.lock().await;
        match tables.alerts.get_mut(&id) {
            Some(alert) if alert.is_eligible() => {
                alert.triggered = true;
                alert.is_active = false;
                alert.triggered_at = Some(at);
                Ok(Some(alert.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_alert(&self, id: DbId, identity_id: DbId) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let owned = tables
            .alerts
            .get(&id)
            .is_some_and(|a| a.identity_id == identity_id);
        if owned {
            tables.alerts.remove(&id);
        }
        Ok(owned)
    }
}
