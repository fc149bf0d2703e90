//! Identity merge rules for third-party (OAuth) sign-in callbacks.
//!
//! A callback carries a provider name, the provider's user id, and an email.
//! The resolver looks up an existing identity by provider identity and by
//! email, then asks [`resolve`] what to do. Keeping the decision pure lets it
//! be tested without a store.

use crate::error::CoreError;
use crate::types::DbId;
use crate::validation::validate_email;

/// Claims received from an identity provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderClaims {
    /// Provider name, e.g. `"google"` or `"github"`.
    pub provider: String,
    /// The provider's stable user id.
    pub provider_id: String,
    /// Email address reported by the provider.
    pub email: String,
}

impl ProviderClaims {
    /// Validate and normalize callback claims at the boundary.
    ///
    /// Provider names are lowercased; ids and emails are trimmed.
    pub fn new(provider: &str, provider_id: &str, email: &str) -> Result<Self, CoreError> {
        let provider = provider.trim().to_ascii_lowercase();
        let provider_id = provider_id.trim().to_string();
        let email = email.trim().to_string();

        if provider.is_empty() {
            return Err(CoreError::Validation("Provider name is required".into()));
        }
        if provider_id.is_empty() {
            return Err(CoreError::Validation("Provider user id is required".into()));
        }
        validate_email(&email)?;

        Ok(Self {
            provider,
            provider_id,
            email,
        })
    }
}

/// The provider link state of an identity found during lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub id: DbId,
    /// Whether the identity already has any external provider attached.
    pub has_provider: bool,
}

/// What the resolver must do with a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No identity matches: create one with the provider attached.
    Create,
    /// An identity with the same email has no provider: attach this one.
    Link { identity_id: DbId },
    /// An already-linked identity matches: use it unchanged.
    Existing { identity_id: DbId },
}

/// Decide how to merge a callback into the identity set.
///
/// A provider-identity match always wins. Otherwise an email match is linked
/// when it has no provider yet, and returned unchanged when it is already
/// linked (possibly to a different provider).
pub fn resolve(by_provider: Option<Candidate>, by_email: Option<Candidate>) -> Resolution {
    if let Some(found) = by_provider {
        return Resolution::Existing {
            identity_id: found.id,
        };
    }
    match by_email {
        None => Resolution::Create,
        Some(found) if !found.has_provider => Resolution::Link {
            identity_id: found.id,
        },
        Some(found) => Resolution::Existing {
            identity_id: found.id,
        },
    }
}
