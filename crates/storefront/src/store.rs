//! The persisted client snapshot: cart lines, favorites and session profile.
//!
//! One [`PersistedStore`] is shared by the cart store and the session guard.
//! Every mutation rewrites the whole snapshot under the `verger.store` key.
//!
//! # Versioning
//!
//! The stored document carries a `version` tag. Version 0 is the legacy
//! envelope `{"state": {...}, "version": 0}` which also stored a redundant
//! `isAuthenticated` flag; it is migrated on load. Documents from a newer
//! schema are refused and the store starts empty.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::Product;
use crate::cart::CartLine;
use crate::models::{UserProfile, storage_keys};
use crate::storage::{Storage, StorageError};

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything the client keeps across restarts, apart from the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Cart lines in insertion order.
    #[serde(default)]
    pub cart: Vec<CartLine>,
    /// Favorite products, unique by product ID.
    #[serde(default)]
    pub favorites: Vec<Product>,
    /// Profile of the signed-in user.
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl Snapshot {
    /// Whether a user profile is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Serialize)]
struct VersionedRef<'a> {
    version: u32,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

/// Encode a snapshot with the current version tag.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(snapshot: &Snapshot) -> Result<String, StorageError> {
    Ok(serde_json::to_string(&VersionedRef {
        version: SNAPSHOT_VERSION,
        snapshot,
    })?)
}

/// Decode a stored snapshot, migrating older layouts.
///
/// # Errors
///
/// Returns an error if the document is malformed or was written by a newer
/// schema.
pub fn decode(raw: &str) -> Result<Snapshot, StorageError> {
    let mut value: Value = serde_json::from_str(raw)?;
    let version = value.get("version").and_then(Value::as_u64).unwrap_or(0);

    match version {
        0 => migrate_v0(value),
        1 => {
            if let Some(object) = value.as_object_mut() {
                object.remove("version");
            }
            Ok(serde_json::from_value(value)?)
        }
        found => Err(StorageError::UnsupportedVersion {
            found,
            latest: SNAPSHOT_VERSION,
        }),
    }
}

fn migrate_v0(mut value: Value) -> Result<Snapshot, StorageError> {
    let mut state = match value.get_mut("state") {
        Some(state) => state.take(),
        None => value,
    };

    let flagged_out = state
        .get("isAuthenticated")
        .and_then(Value::as_bool)
        .is_some_and(|authenticated| !authenticated);

    if let Some(object) = state.as_object_mut() {
        object.remove("isAuthenticated");
        object.remove("version");
    }

    let mut snapshot: Snapshot = serde_json::from_value(state)?;
    // The legacy flag could disagree with the profile; a logged-out flag wins.
    if flagged_out {
        snapshot.user = None;
    }
    tracing::info!(
        lines = snapshot.cart.len(),
        favorites = snapshot.favorites.len(),
        "Migrated legacy snapshot to version {SNAPSHOT_VERSION}"
    );
    Ok(snapshot)
}

// =============================================================================
// PersistedStore
// =============================================================================

/// Shared handle to the persisted snapshot.
///
/// Cloning is cheap. Reads and mutations take an internal mutex, and a
/// mutation holds it until the new snapshot is written, so two mutations
/// never interleave.
#[derive(Clone)]
pub struct PersistedStore {
    inner: Arc<PersistedStoreInner>,
}

struct PersistedStoreInner {
    storage: Arc<dyn Storage>,
    snapshot: Mutex<Snapshot>,
}

impl PersistedStore {
    /// Load the snapshot from storage.
    ///
    /// A missing, malformed or too-new document yields an empty snapshot.
    #[must_use]
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let snapshot = match storage.get(storage_keys::STORE) {
            Ok(Some(raw)) => decode(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding unreadable snapshot");
                Snapshot::default()
            }),
            Ok(None) => Snapshot::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read snapshot");
                Snapshot::default()
            }
        };

        Self {
            inner: Arc::new(PersistedStoreInner {
                storage,
                snapshot: Mutex::new(snapshot),
            }),
        }
    }

    /// Read from the current snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        let snapshot = self
            .inner
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&snapshot)
    }

    /// A copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.read(Clone::clone)
    }

    /// Mutate the snapshot and persist the result.
    ///
    /// Write failures are logged; the in-memory snapshot stays authoritative.
    pub fn update<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        let mut snapshot = self
            .inner
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut snapshot);

        let written = encode(&snapshot)
            .and_then(|raw| self.inner.storage.set(storage_keys::STORE, &raw));
        if let Err(e) = written {
            tracing::warn!(error = %e, "Failed to persist snapshot");
        }
        result
    }
}

impl std::fmt::Debug for PersistedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.read(|snapshot| {
            f.debug_struct("PersistedStore")
                .field("cart_lines", &snapshot.cart.len())
                .field("favorites", &snapshot.favorites.len())
                .field("authenticated", &snapshot.is_authenticated())
                .finish()
        })
    }
}
