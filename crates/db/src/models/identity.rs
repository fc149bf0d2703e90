//! Identity entity model and DTOs.

use markethub_core::oauth::{Candidate, ProviderClaims};
use markethub_core::roles::Role;
use markethub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full identity row from the `identities` table.
///
/// Contains the password hash and the 2FA secret -- NEVER serialize this to
/// responses directly. Use [`IdentityResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct Identity {
    pub id: DbId,
    pub email: String,
    pub password_hash: Option<String>,
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_verified: bool,
    pub two_factor_enabled: bool,
    pub two_factor_secret: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Identity {
    /// Link state used by the OAuth merge decision.
    pub fn as_candidate(&self) -> Candidate {
        Candidate {
            id: self.id,
            has_provider: self.oauth_provider.is_some(),
        }
    }
}

/// Safe identity representation (no password hash, no 2FA secret).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityResponse {
    pub id: DbId,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
    pub two_factor_enabled: bool,
    pub oauth_provider: Option<String>,
    pub created_at: Timestamp,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            is_verified: identity.is_verified,
            two_factor_enabled: identity.two_factor_enabled,
            oauth_provider: identity.oauth_provider.clone(),
            created_at: identity.created_at,
        }
    }
}

/// DTO for creating a new identity.
///
/// Build it through [`CreateIdentity::with_password`] or
/// [`CreateIdentity::from_provider`] so every identity carries a credential.
#[derive(Debug, Clone)]
pub struct CreateIdentity {
    pub email: String,
    pub password_hash: Option<String>,
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
    pub role: Role,
    pub is_verified: bool,
}

impl CreateIdentity {
    /// A password-based, unverified standard user.
    pub fn with_password(email: &str, password_hash: String) -> Self {
        Self {
            email: email.to_string(),
            password_hash: Some(password_hash),
            oauth_provider: None,
            oauth_id: None,
            role: Role::User,
            is_verified: false,
        }
    }

    /// A provider-only standard user. Provider accounts arrive verified.
    pub fn from_provider(claims: &ProviderClaims) -> Self {
        Self {
            email: claims.email.clone(),
            password_hash: None,
            oauth_provider: Some(claims.provider.clone()),
            oauth_id: Some(claims.provider_id.clone()),
            role: Role::User,
            is_verified: true,
        }
    }
}
