//! Registration, password login, and third-party sign-in.

use std::sync::Arc;

use markethub_core::error::CoreError;
use markethub_core::oauth::{self, ProviderClaims, Resolution};
use markethub_core::types::DbId;
use markethub_core::validation::validate_email;
use markethub_db::models::identity::{CreateIdentity, Identity, IdentityResponse};
use markethub_db::store::constraints;
use markethub_db::CredentialStore;
use serde::{Deserialize, Serialize};

use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::tokens::{TokenIssuer, TokenPair};
use crate::two_factor::TwoFactorManager;

/// Lookup-decide-write passes before a provider callback gives up.
const MAX_RESOLVE_ATTEMPTS: usize = 3;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Current TOTP code, required once 2FA is enabled.
    #[serde(default)]
    pub code: Option<String>,
}

/// An authenticated identity with a fresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub identity: IdentityResponse,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Result of a password login.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    Authenticated(AuthSession),
    /// Credentials were correct but a 2FA code must accompany them.
    TwoFactorRequired,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Maps registration, login, and provider callbacks onto identity records.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn CredentialStore>,
    tokens: TokenIssuer,
    two_factor: TwoFactorManager,
    min_password_length: usize,
}

impl IdentityResolver {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: TokenIssuer,
        two_factor: TwoFactorManager,
        min_password_length: usize,
    ) -> Self {
        Self {
            store,
            tokens,
            two_factor,
            min_password_length,
        }
    }

    /// Create a password identity and sign it in.
    pub async fn register(&self, input: &RegisterRequest) -> AppResult<AuthSession> {
        let email = input.email.trim();
        validate_email(email)?;
        validate_password_strength(&input.password, self.min_password_length)?;

        if self.store.find_identity_by_email(email).await?.is_some() {
            return Err(email_taken());
        }

        let password_hash = hash_password(&input.password)
            .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

        let identity = self
            .store
            .create_identity(&CreateIdentity::with_password(email, password_hash))
            .await
            .map_err(|e| {
                if e.is_conflict_on(constraints::IDENTITY_EMAIL) {
                    email_taken()
                } else {
                    e.into()
                }
            })?;

        tracing::info!(identity_id = identity.id, "Identity registered");
        self.start_session(&identity).await
    }

    /// Check a password (and 2FA code, when enabled) and sign in.
    pub async fn authenticate(&self, input: &LoginRequest) -> AppResult<LoginOutcome> {
        let identity = self
            .store
            .find_identity_by_email(input.email.trim())
            .await?
            .ok_or_else(|| {
                tracing::warn!("Login attempt for unknown email");
                CoreError::InvalidCredentials
            })?;

        let Some(password_hash) = identity.password_hash.as_deref() else {
            tracing::warn!(identity_id = identity.id, "Password login on provider-only identity");
            return Err(CoreError::InvalidCredentials.into());
        };

        let password_valid = verify_password(&input.password, password_hash)
            .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
        if !password_valid {
            tracing::warn!(identity_id = identity.id, "Login rejected: wrong password");
            return Err(CoreError::InvalidCredentials.into());
        }

        if identity.two_factor_enabled {
            // A blank code counts as not supplied.
            match input.code.as_deref().filter(|code| !code.trim().is_empty()) {
                None => return Ok(LoginOutcome::TwoFactorRequired),
                Some(code) => {
                    if let Err(e) = self.two_factor.check_login_code(&identity, code) {
                        tracing::warn!(identity_id = identity.id, "Login rejected: bad 2FA code");
                        return Err(e);
                    }
                }
            }
        }

        tracing::info!(identity_id = identity.id, "Login succeeded");
        Ok(LoginOutcome::Authenticated(self.start_session(&identity).await?))
    }

    /// Find, link, or create the identity for a provider callback.
    ///
    /// Idempotent: repeating a callback returns the same identity.
    pub async fn resolve_oauth_identity(&self, claims: &ProviderClaims) -> AppResult<Identity> {
        for _ in 0..MAX_RESOLVE_ATTEMPTS {
            if let Some(identity) = self.try_resolve_oauth(claims).await? {
                return Ok(identity);
            }
        }
        Err(AppError::InternalError(format!(
            "Could not settle identity for {}:{}",
            claims.provider, claims.provider_id
        )))
    }

    /// One lookup-decide-write pass. `None` means a concurrent writer changed
    /// the picture and the pass must be repeated.
    async fn try_resolve_oauth(&self, claims: &ProviderClaims) -> AppResult<Option<Identity>> {
        let by_provider = self
            .store
            .find_identity_by_provider(&claims.provider, &claims.provider_id)
            .await?;
        let by_email = match &by_provider {
            Some(_) => None,
            None => self.store.find_identity_by_email(&claims.email).await?,
        };

        let decision = oauth::resolve(
            by_provider.as_ref().map(Identity::as_candidate),
            by_email.as_ref().map(Identity::as_candidate),
        );

        match decision {
            Resolution::Existing { identity_id } => Ok(by_provider
                .or(by_email)
                .filter(|identity| identity.id == identity_id)),
            Resolution::Link { identity_id } => {
                let linked = self
                    .store
                    .link_provider(identity_id, &claims.provider, &claims.provider_id)
                    .await;
                match linked {
                    Ok(Some(identity)) => {
                        tracing::info!(
                            identity_id,
                            provider = %claims.provider,
                            "Provider linked to existing identity"
                        );
                        Ok(Some(identity))
                    }
                    // Another callback linked first.
                    Ok(None) => Ok(self.store.find_identity_by_id(identity_id).await?),
                    Err(e) if e.is_conflict_on(constraints::IDENTITY_PROVIDER) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            Resolution::Create => {
                let created = self
                    .store
                    .create_identity(&CreateIdentity::from_provider(claims))
                    .await;
                match created {
                    Ok(identity) => {
                        tracing::info!(
                            identity_id = identity.id,
                            provider = %claims.provider,
                            "Identity created from provider"
                        );
                        Ok(Some(identity))
                    }
                    Err(e)
                        if e.is_conflict_on(constraints::IDENTITY_PROVIDER)
                            || e.is_conflict_on(constraints::IDENTITY_EMAIL) =>
                    {
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Resolve a provider callback and sign the identity in.
    pub async fn oauth_login(&self, claims: &ProviderClaims) -> AppResult<AuthSession> {
        let identity = self.resolve_oauth_identity(claims).await?;
        self.start_session(&identity).await
    }

    /// Profile lookup for an authenticated identity.
    pub async fn current_identity(&self, identity_id: DbId) -> AppResult<IdentityResponse> {
        let identity = self.reload(identity_id).await?;
        Ok(IdentityResponse::from(&identity))
    }

    async fn start_session(&self, identity: &Identity) -> AppResult<AuthSession> {
        let tokens = self
            .tokens
            .issue(identity.id, &identity.email, identity.role)
            .await?;
        Ok(AuthSession {
            identity: IdentityResponse::from(identity),
            tokens,
        })
    }

    async fn reload(&self, identity_id: DbId) -> AppResult<Identity> {
        self.store
            .find_identity_by_id(identity_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "identity",
                    id: identity_id,
                }
                .into()
            })
    }
}

fn email_taken() -> AppError {
    CoreError::AlreadyExists("Email is already registered".into()).into()
}
