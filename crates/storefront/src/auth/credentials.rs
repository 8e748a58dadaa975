//! Bearer token slot in durable storage.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::models::storage_keys;
use crate::storage::{Storage, StorageError};

/// Reads and writes the bearer token issued by the identity endpoint.
///
/// The token is kept apart from the persisted snapshot so that clearing the
/// session never depends on rewriting the cart.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
}

impl CredentialStore {
    /// Wrap a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The stored token, if any.
    ///
    /// Read failures are logged and treated as "no token".
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        match self.storage.get(storage_keys::AUTH_TOKEN) {
            Ok(Some(raw)) => {
                let token = raw.trim();
                (!token.is_empty()).then(|| SecretString::from(token.to_owned()))
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }

    /// Whether a token is stored.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Store a new token, replacing the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be written.
    pub fn set_token(&self, token: &SecretString) -> Result<(), StorageError> {
        self.storage
            .set(storage_keys::AUTH_TOKEN, token.expose_secret())
    }

    /// Discard the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(storage_keys::AUTH_TOKEN)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("token", &self.has_token().then_some("[REDACTED]"))
            .finish()
    }
}
