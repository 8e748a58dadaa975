//! Domain models for the storefront.

pub mod session;
pub mod user;

pub use session::keys as storage_keys;
pub use user::UserProfile;
