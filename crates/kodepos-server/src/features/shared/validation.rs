//! Shared validation utilities
//!
//! Common validation functions for caller-supplied input, used by commands
//! before any job row exists.

use thiserror::Error;

/// Errors that can occur during filename validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilenameValidationError {
    #[error("Filename is required and cannot be empty")]
    Required,

    #[error("Filename must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },

    #[error("Filename cannot contain path separators")]
    ContainsPathSeparator,
}

/// Errors that can occur during email validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmailValidationError {
    #[error("Email address '{0}' is invalid")]
    InvalidFormat(String),
}

/// Validate a submitted filename
///
/// # Rules
/// - Must not be empty (after trimming whitespace)
/// - Must not exceed max_length characters
/// - Must not contain path separators
pub fn validate_filename(
    filename: &str,
    max_length: usize,
) -> Result<(), FilenameValidationError> {
    if filename.trim().is_empty() {
        return Err(FilenameValidationError::Required);
    }

    if filename.len() > max_length {
        return Err(FilenameValidationError::TooLong { max_length });
    }

    if filename.contains('/') || filename.contains('\\') {
        return Err(FilenameValidationError::ContainsPathSeparator);
    }

    Ok(())
}

/// Validate a notification email address
///
/// Basic shape check only: one `@` with a non-empty local part and a domain
/// containing a dot. Delivery is confirmed elsewhere.
pub fn validate_email(email: &str) -> Result<(), EmailValidationError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(EmailValidationError::InvalidFormat(email.to_string()));
    };

    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.contains(char::is_whitespace)
    {
        return Err(EmailValidationError::InvalidFormat(email.to_string()));
    }

    Ok(())
}

/// Validate an optional notification email
pub fn validate_optional_email(email: Option<&str>) -> Result<(), EmailValidationError> {
    if let Some(email) = email {
        validate_email(email)?;
    }
    Ok(())
}
