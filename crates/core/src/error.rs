use crate::types::DbId;

/// Domain errors surfaced to callers of the identity and alert services.
///
/// Every variant is terminal for the request that produced it. Credential
/// failures deliberately share one message so callers cannot tell a missing
/// account from a wrong password.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidOrExpired,

    #[error("Two-factor authentication is not set up")]
    NotEnrolled,

    #[error("Two-factor authentication is not enabled")]
    NotEnabled,

    #[error("Two-factor authentication is already enabled")]
    AlreadyEnabled,

    #[error("Invalid two-factor code")]
    InvalidCode,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable code for the routing layer.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::AlreadyExists(_) => "ALREADY_EXISTS",
            CoreError::InvalidCredentials => "INVALID_CREDENTIALS",
            CoreError::InvalidOrExpired => "INVALID_OR_EXPIRED",
            CoreError::NotEnrolled => "TWO_FACTOR_NOT_ENROLLED",
            CoreError::NotEnabled => "TWO_FACTOR_NOT_ENABLED",
            CoreError::AlreadyEnabled => "TWO_FACTOR_ALREADY_ENABLED",
            CoreError::InvalidCode => "INVALID_CODE",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
