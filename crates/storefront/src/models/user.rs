//! User domain types.
//!
//! The profile is owned by the backend; the storefront keeps the last copy
//! returned by the identity endpoint inside the persisted snapshot.

use serde::{Deserialize, Serialize};

use verger_core::{Email, UserId};

/// The authenticated shopper's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Backend user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: Email,
    /// Contact phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Loyalty points balance.
    #[serde(default)]
    pub loyalty_points: u32,
}
