//! Two-factor enrollment lifecycle: `unenrolled -> pending -> enabled`.
//!
//! The secret lives on the identity record. A pending enrollment has a
//! secret with `two_factor_enabled = false`; disabling clears the secret.

use std::sync::Arc;

use chrono::Utc;
use markethub_core::error::CoreError;
use markethub_core::totp::{self, TotpConfig};
use markethub_core::types::DbId;
use markethub_db::models::identity::Identity;
use markethub_db::CredentialStore;
use serde::Serialize;

use crate::error::AppResult;

/// A freshly generated shared secret and its provisioning URI.
#[derive(Debug, Clone, Serialize)]
pub struct Enrollment {
    pub secret: String,
    /// `otpauth://` URI to render as a QR code.
    pub enrollment_uri: String,
}

#[derive(Clone)]
pub struct TwoFactorManager {
    store: Arc<dyn CredentialStore>,
    config: TotpConfig,
}

impl TwoFactorManager {
    pub fn new(store: Arc<dyn CredentialStore>, config: TotpConfig) -> Self {
        Self { store, config }
    }

    /// Start (or restart) enrollment with a new pending secret.
    pub async fn enroll(&self, identity_id: DbId) -> AppResult<Enrollment> {
        let identity = self.load(identity_id).await?;
        if identity.two_factor_enabled {
            return Err(CoreError::AlreadyEnabled.into());
        }

        let secret = totp::generate_secret();
        let Some(updated) = self.store.set_pending_two_factor(identity_id, &secret).await? else {
            // Enabled (or removed) between the read and the write.
            self.load(identity_id).await?;
            return Err(CoreError::AlreadyEnabled.into());
        };

        tracing::info!(identity_id, "Two-factor enrollment started");
        Ok(Enrollment {
            enrollment_uri: totp::provisioning_uri(&self.config.issuer, &updated.email, &secret),
            secret,
        })
    }

    /// Confirm a pending enrollment with a code from the authenticator.
    ///
    /// Verifying an already-enabled enrollment with a valid code succeeds.
    pub async fn verify(&self, identity_id: DbId, code: &str) -> AppResult<()> {
        let identity = self.load(identity_id).await?;
        let secret = identity
            .two_factor_secret
            .as_deref()
            .ok_or(CoreError::NotEnrolled)?;

        self.check(secret, code)?;

        // Guarded on the verified secret: a concurrent re-enroll wins.
        if !self.store.enable_two_factor(identity_id, secret).await? {
            tracing::warn!(identity_id, "Two-factor secret changed during verification");
            return Err(CoreError::InvalidCode.into());
        }

        tracing::info!(identity_id, "Two-factor authentication enabled");
        Ok(())
    }

    /// Turn 2FA off after re-checking a current code.
    pub async fn disable(&self, identity_id: DbId, code: &str) -> AppResult<()> {
        let identity = self.load(identity_id).await?;
        if !identity.two_factor_enabled {
            return Err(CoreError::NotEnabled.into());
        }
        let secret = identity
            .two_factor_secret
            .as_deref()
            .ok_or(CoreError::NotEnabled)?;

        self.check(secret, code)?;

        if !self.store.disable_two_factor(identity_id, secret).await? {
            return Err(CoreError::NotEnabled.into());
        }

        tracing::info!(identity_id, "Two-factor authentication disabled");
        Ok(())
    }

    /// Check a login code for an identity with 2FA enabled.
    pub fn check_login_code(&self, identity: &Identity, code: &str) -> AppResult<()> {
        let secret = identity
            .two_factor_secret
            .as_deref()
            .ok_or(CoreError::NotEnabled)?;
        self.check(secret, code)
    }

    fn check(&self, secret: &str, code: &str) -> AppResult<()> {
        if totp::verify_code(secret, code, unix_now(), &self.config)? {
            Ok(())
        } else {
            Err(CoreError::InvalidCode.into())
        }
    }

    async fn load(&self, identity_id: DbId) -> AppResult<Identity> {
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

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}
