//! Username validation for the login flow.
//!
//! Display names end up embedded in protocol reply lines (`USERS` comma lists,
//! `USER_JOINED`/`USER_LEFT` pushes, message summary strings), so the characters
//! used as delimiters there are rejected here.

/// Username validation errors with helpful messages
#[derive(Debug, thiserror::Error)]
pub enum UsernameError {
    #[error("Username cannot be empty")]
    Empty,

    #[error("Username is too long (maximum {max} bytes)")]
    TooLong { max: usize },

    #[error("Username cannot contain whitespace or control characters")]
    InvalidWhitespace,

    #[error("Username cannot contain '|' or ','")]
    ReservedDelimiter,
}

/// Maximum accepted username length in bytes.
pub const MAX_USERNAME_BYTES: usize = 30;

/// Validate a display name, returning the trimmed form accepted for login.
pub fn validate_username(username: &str) -> Result<String, UsernameError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(UsernameError::Empty);
    }
    if trimmed.len() > MAX_USERNAME_BYTES {
        return Err(UsernameError::TooLong {
            max: MAX_USERNAME_BYTES,
        });
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(UsernameError::InvalidWhitespace);
    }
    if trimmed.contains('|') || trimmed.contains(',') {
        return Err(UsernameError::ReservedDelimiter);
    }

    Ok(trimmed.to_string())
}
