//! Durable storage keys.
//!
//! Everything the storefront persists lives under the `verger.` namespace.

/// Keys for entries in [`crate::storage::Storage`].
pub mod keys {
    /// Key for the versioned snapshot of cart, favorites and session profile.
    pub const STORE: &str = "verger.store";

    /// Key for the bearer token issued by the identity endpoint.
    pub const AUTH_TOKEN: &str = "verger.token";
}
