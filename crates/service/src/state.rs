use std::sync::Arc;

use markethub_db::CredentialStore;

use crate::alerts::{AlertEngine, AlertService};
use crate::config::ServiceConfig;
use crate::identity::IdentityResolver;
use crate::tokens::TokenIssuer;
use crate::two_factor::TwoFactorManager;

/// Shared service handles for the routing layer and background tasks.
///
/// Cheaply cloneable: every component holds the store behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub config: Arc<ServiceConfig>,
    pub identities: IdentityResolver,
    pub tokens: TokenIssuer,
    pub two_factor: TwoFactorManager,
    pub alerts: AlertService,
    pub engine: AlertEngine,
}

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, config: ServiceConfig) -> Self {
        let tokens = TokenIssuer::new(Arc::clone(&store), config.jwt.clone());
        let two_factor = TwoFactorManager::new(Arc::clone(&store), config.totp.clone());
        let identities = IdentityResolver::new(
            Arc::clone(&store),
            tokens.clone(),
            two_factor.clone(),
            config.min_password_length,
        );

        Self {
            alerts: AlertService::new(Arc::clone(&store)),
            engine: AlertEngine::new(Arc::clone(&store)),
            identities,
            tokens,
            two_factor,
            config: Arc::new(config),
            store,
        }
    }
}
