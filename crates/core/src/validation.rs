//! Boundary input checks shared by the identity operations.

use crate::error::CoreError;

/// Maximum accepted email length (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Validate the structure of an email address.
///
/// This is a shape check, not deliverability: exactly one `@`, a non-empty
/// local part, a dotted domain, and no whitespace.
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    let invalid = || CoreError::Validation(format!("'{email}' is not a valid email address"));

    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return Err(invalid());
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}
