//! Wire types for the storefront backend.
//!
//! The backend speaks camelCase JSON. Decimal amounts accept either strings or
//! numbers on input and are written back as strings.

use core::fmt;
use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use verger_core::{CurrencyCode, Email, OrderId, OrderStatus, PaymentMethod, ProductId, VariantId};

use crate::checkout::FulfillmentDetails;
use crate::models::UserProfile;

// =============================================================================
// Catalog Types
// =============================================================================

/// A product as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend product ID.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Image URL or asset path.
    #[serde(default)]
    pub image: Option<String>,
    /// Category slug (e.g., "fruits", "vegetables").
    pub category: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Purchasable variants, in display order.
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    /// Look up one of this product's variants.
    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| &v.id == id)
    }

    /// Cheapest variant price, if the product has any variant.
    #[must_use]
    pub fn price_from(&self) -> Option<Decimal> {
        self.variants.iter().map(|v| v.price).min()
    }
}

/// A purchasable variant of a product (e.g., "1 kg box", "single melon").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Backend variant ID.
    pub id: VariantId,
    /// Display name.
    pub name: String,
    /// Unit price (never negative).
    #[serde(deserialize_with = "non_negative_price")]
    pub price: Decimal,
    /// How the variant is sold.
    #[serde(flatten)]
    pub unit: Unit,
    /// Named options (e.g., "size" = "large").
    #[serde(default)]
    pub options: Vec<VariantOption>,
}

impl Variant {
    /// Human-readable descriptor used on order lines.
    ///
    /// The name followed by option values (`"Box / Large"`); falls back to
    /// the weight for nameless weight variants.
    #[must_use]
    pub fn descriptor(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !self.name.trim().is_empty() {
            parts.push(self.name.trim().to_owned());
        }
        parts.extend(
            self.options
                .iter()
                .map(|o| o.value.trim().to_owned())
                .filter(|v| !v.is_empty()),
        );
        if parts.is_empty() {
            return self.unit.to_string();
        }
        parts.join(" / ")
    }
}

fn non_negative_price<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let price = <Decimal as Deserialize>::deserialize(deserializer)?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(serde::de::Error::custom(format!(
            "variant price cannot be negative: {price}"
        )));
    }
    Ok(price)
}

/// Unit a variant is sold by.
///
/// Serialized as `unitType` plus `weightGrams` for weight variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "unitType", rename_all = "snake_case")]
pub enum Unit {
    /// Sold by weight; `grams` is the weight of one unit.
    Weight {
        #[serde(rename = "weightGrams")]
        grams: NonZeroU32,
    },
    /// Sold per piece.
    Piece,
}

impl Unit {
    /// Wire name of the unit type.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Weight { .. } => "weight",
            Self::Piece => "piece",
        }
    }

    /// Gram count for weight units.
    #[must_use]
    pub const fn grams(&self) -> Option<u32> {
        match self {
            Self::Weight { grams } => Some(grams.get()),
            Self::Piece => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weight { grams } if grams.get() >= 1000 && grams.get() % 1000 == 0 => {
                write!(f, "{} kg", grams.get() / 1000)
            }
            Self::Weight { grams } => write!(f, "{grams} g"),
            Self::Piece => f.write_str("piece"),
        }
    }
}

/// A named option on a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOption {
    /// Option name (e.g., "size").
    pub name: String,
    /// Option value (e.g., "large").
    pub value: String,
}

/// Catalog query parameters for `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    /// Restrict to one category.
    pub category: Option<String>,
    /// Free-text search.
    pub search: Option<String>,
    /// 1-indexed page number.
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

impl ProductQuery {
    /// Query-string pairs for the request, skipping unset parameters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            pairs.push(("category", category.to_owned()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_owned()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Total number of matching items.
    pub total: u64,
    /// Current page (1-indexed).
    pub page: u32,
    /// Total number of pages.
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Whether another page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// One frozen line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product the line was bought from.
    pub product_id: ProductId,
    /// Product title at submission time.
    pub title: String,
    /// Variant descriptor at submission time.
    pub variant: String,
    /// `weight` or `piece`.
    pub unit_type: String,
    /// Grams per unit for weight variants.
    #[serde(default)]
    pub grams: Option<u32>,
    /// Number of units.
    pub quantity: u32,
    /// Unit price at submission time.
    pub unit_price: Decimal,
    /// `unit_price × quantity`.
    pub line_total: Decimal,
    /// Image reference.
    #[serde(default)]
    pub image: Option<String>,
    /// Currency of the amounts.
    pub currency: CurrencyCode,
}

/// Customer contact details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContact {
    /// Full name.
    pub full_name: String,
    /// Contact email.
    pub email: Email,
    /// Contact phone.
    pub phone: String,
}

/// Everything an order carries before the backend assigns it an ID.
///
/// This is also the body sent when asking a payment provider for a payment
/// intent or provider order, before any order exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrder {
    /// Frozen cart lines.
    pub items: Vec<OrderItem>,
    /// Contact details.
    pub customer: CustomerContact,
    /// Pickup or delivery details.
    pub fulfillment: FulfillmentDetails,
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// Delivery fee (zero for pickup).
    pub delivery_fee: Decimal,
    /// `subtotal + delivery_fee`.
    pub total: Decimal,
    /// Currency of all amounts.
    pub currency: CurrencyCode,
    /// Chosen payment method.
    pub payment_method: PaymentMethod,
    /// Discount code (unused by the current checkout flow).
    #[serde(default)]
    pub discount_code: Option<String>,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    /// The order contents.
    #[serde(flatten)]
    pub draft: DraftOrder,
    /// Initial status.
    pub status: OrderStatus,
    /// Provider reference (payment intent or capture ID) for paid orders.
    #[serde(default)]
    pub payment_reference: Option<String>,
}

impl NewOrder {
    /// A cash order awaiting payment on pickup or delivery.
    #[must_use]
    pub const fn pending(draft: DraftOrder) -> Self {
        Self {
            draft,
            status: OrderStatus::Pending,
            payment_reference: None,
        }
    }

    /// An order whose payment a provider already confirmed.
    #[must_use]
    pub const fn paid(draft: DraftOrder, payment_reference: String) -> Self {
        Self {
            draft,
            status: OrderStatus::Paid,
            payment_reference: Some(payment_reference),
        }
    }
}

/// An order persisted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Backend order ID.
    pub id: OrderId,
    /// The order contents.
    #[serde(flatten)]
    pub draft: DraftOrder,
    /// Current status.
    pub status: OrderStatus,
    /// Provider reference for paid orders.
    #[serde(default)]
    pub payment_reference: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Types
// =============================================================================

/// A card payment intent created by the backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Secret handed to the card widget to confirm the payment.
    pub client_secret: String,
    /// Provider-side intent ID, when the backend exposes it.
    #[serde(default)]
    pub intent_id: Option<String>,
}

impl fmt::Debug for PaymentIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentIntent")
            .field("client_secret", &"[REDACTED]")
            .field("intent_id", &self.intent_id)
            .finish()
    }
}

/// A PayPal order created by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPalOrder {
    /// PayPal order ID handed to the PayPal buttons.
    pub id: String,
}

/// Body of `POST /payments/paypal/capture`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    /// PayPal order to capture.
    pub order_id: String,
}

/// Result of capturing a PayPal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPalCapture {
    /// Capture ID, stored as the order's payment reference.
    pub id: String,
    /// Provider status (e.g., "COMPLETED").
    pub status: String,
}

impl PayPalCapture {
    /// Whether PayPal reports the capture as completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("completed")
    }
}

// =============================================================================
// Identity Types
// =============================================================================

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: Email,
    /// Plain-text password (sent over TLS only).
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /auth/register`.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: Email,
    /// Contact phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Plain-text password (sent over TLS only).
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Response of login and registration.
#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The authenticated profile.
    pub user: UserProfile,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Body of `PUT /profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Body of `POST /auth/forgot`.
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    /// Account email.
    pub email: Email,
}
