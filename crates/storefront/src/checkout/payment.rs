//! Seams to the third-party payment widgets.
//!
//! The widgets themselves (card form, PayPal buttons) live in the front end.
//! The checkout only needs them to confirm or approve a payment it prepared.

use async_trait::async_trait;
use thiserror::Error;

/// A payment the provider confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Provider reference (payment intent or capture ID).
    pub reference: String,
}

impl PaymentConfirmation {
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

/// A payment the provider or the shopper refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PaymentFailure {
    /// Message shown inline next to the widget.
    pub message: String,
}

impl PaymentFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Card widget: confirms a payment intent.
#[async_trait]
pub trait CardPaymentWidget: Send + Sync {
    /// Collect card details and confirm the intent behind `client_secret`.
    async fn confirm(&self, client_secret: &str) -> Result<PaymentConfirmation, PaymentFailure>;
}

/// PayPal buttons: get a provider order approved by the shopper.
#[async_trait]
pub trait PayPalWidget: Send + Sync {
    /// Have the shopper approve `provider_order_id`.
    async fn approve(&self, provider_order_id: &str) -> Result<(), PaymentFailure>;
}
