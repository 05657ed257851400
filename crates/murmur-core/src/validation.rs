//! Input rules shared by the relay and the client.

use crate::constants::{USERNAME_MAX_CHARS, USERNAME_MIN_CHARS};
use crate::errors::RelayError;

/// Validate a proposed username and return it trimmed.
///
/// Length is measured in characters, not bytes.
pub fn validate_username(proposed: &str) -> Result<&str, RelayError> {
    let trimmed = proposed.trim();
    let len = trimmed.chars().count();
    if len < USERNAME_MIN_CHARS {
        return Err(RelayError::UsernameTooShort);
    }
    if len > USERNAME_MAX_CHARS {
        return Err(RelayError::UsernameTooLong);
    }
    Ok(trimmed)
}

/// Reject message bodies that are empty after trimming.
///
/// The body itself is relayed as sent; escaping is the renderer's job.
pub fn validate_body(body: &str) -> Result<(), RelayError> {
    if body.trim().is_empty() {
        Err(RelayError::EmptyMessage)
    } else {
        Ok(())
    }
}
