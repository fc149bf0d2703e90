use markethub_core::error::CoreError;
use markethub_db::StoreError;

/// Service-level error type.
///
/// Wraps [`CoreError`] for domain outcomes and [`StoreError`] for storage
/// failures, and adds a variant for other infrastructure failures (token
/// signing, password hashing). Only domain errors reach callers verbatim;
/// see [`AppError::public_message`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `markethub_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure reported by the credential store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for service return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Stable machine-readable code for the routing layer.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Core(core) => core.code(),
            AppError::Store(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error stems from infrastructure rather than the request.
    pub fn is_internal(&self) -> bool {
        self.code() == "INTERNAL_ERROR"
    }

    /// Message safe to return to a caller. Internal details are logged here
    /// and replaced with a generic message.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            tracing::error!(error = %self, "Internal error");
            return "An internal error occurred".to_string();
        }
        self.to_string()
    }

    /// The wrapped domain error, if any.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            AppError::Core(core) => Some(core),
            _ => None,
        }
    }
}
