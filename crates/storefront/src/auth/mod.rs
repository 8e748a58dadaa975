//! Authentication: token storage and the session guard.
//!
//! # Flow
//!
//! 1. Login or registration returns a bearer token and a profile
//! 2. The token goes to its own storage slot, the profile into the snapshot
//! 3. On every start the guard re-validates the token against `GET /auth/me`
//! 4. A rejected token is discarded and the session cleared
//!
//! Protected views ask [`SessionGuard::authorize`] before rendering.

mod credentials;
mod guard;

pub use credentials::CredentialStore;
pub use guard::{Access, SessionGuard, SessionState};

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Minimum display name length (trimmed) accepted at registration.
pub const MIN_NAME_LENGTH: usize = 2;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] verger_core::EmailError),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Display name too short.
    #[error("name must be at least {MIN_NAME_LENGTH} characters")]
    InvalidName,

    /// Operation requires a signed-in user.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Backend call failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Token could not be stored or removed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Message safe to show to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Invalid email address".to_string(),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::InvalidName | Self::NotAuthenticated => self.to_string(),
            Self::Api(err) => err.user_message(),
            Self::Storage(_) => "Could not save your session".to_string(),
        }
    }
}

/// Check a new password against the registration policy.
///
/// # Errors
///
/// Returns [`AuthError::WeakPassword`] if the password is too short or blank.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.trim().is_empty() {
        return Err(AuthError::WeakPassword(
            "Password cannot be blank".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("correct horse").is_ok());
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("          "),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            AuthError::InvalidCredentials.user_message(),
            "Invalid email or password"
        );
        assert_eq!(
            AuthError::InvalidName.user_message(),
            "name must be at least 2 characters"
        );
    }
}
