//! Status and choice enums shared by the storefront and its front ends.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Order lifecycle status as stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created but not yet paid (cash orders).
    #[default]
    Pending,
    /// Paid through an external provider.
    Paid,
    /// Handed over to the customer.
    Completed,
    /// Cancelled by the store or the customer.
    Cancelled,
}

impl OrderStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment confirmed through the card provider widget.
    Card,
    /// PayPal checkout.
    #[serde(rename = "paypal")]
    PayPal,
    /// Pay on pickup or delivery.
    #[default]
    Cash,
}

impl PaymentMethod {
    /// All methods, in display order.
    pub const ALL: [Self; 3] = [Self::Cash, Self::Card, Self::PayPal];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::PayPal => "paypal",
            Self::Cash => "cash",
        }
    }

    /// Whether the order is only created after an external provider confirms payment.
    #[must_use]
    pub const fn requires_external_confirmation(&self) -> bool {
        matches!(self, Self::Card | Self::PayPal)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "paypal" => Ok(Self::PayPal),
            "cash" => Ok(Self::Cash),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Whether an order is picked up in store or delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentType {
    /// Pickup at one of the shops.
    #[default]
    Store,
    /// Home delivery inside a delivery zone.
    Delivery,
}

impl FulfillmentType {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Delivery => "delivery",
        }
    }
}

impl fmt::Display for FulfillmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
