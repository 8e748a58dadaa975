//! Freezing a validated checkout and the cart into a draft order.

use rust_decimal::Decimal;

use verger_core::FulfillmentType;

use super::validation::ValidatedCheckout;
use crate::api::{DraftOrder, OrderItem};
use crate::cart::CartLine;
use crate::config::CheckoutSettings;

/// Delivery fee for a fulfillment type.
#[must_use]
pub fn delivery_fee(fulfillment: FulfillmentType, settings: &CheckoutSettings) -> Decimal {
    match fulfillment {
        FulfillmentType::Delivery => settings.delivery_fee,
        FulfillmentType::Store => Decimal::ZERO,
    }
}

impl OrderItem {
    /// Freeze a cart line.
    #[must_use]
    pub fn from_line(line: &CartLine, settings: &CheckoutSettings) -> Self {
        Self {
            product_id: line.product.id.clone(),
            title: line.product.title.clone(),
            variant: line.variant.descriptor(),
            unit_type: line.variant.unit.kind().to_owned(),
            grams: line.variant.unit.grams(),
            quantity: line.quantity,
            unit_price: line.variant.price,
            line_total: line.line_total(),
            image: line.product.image.clone(),
            currency: settings.currency,
        }
    }
}

impl DraftOrder {
    /// Build the order body from a validated checkout and the cart lines.
    #[must_use]
    pub fn build(
        validated: ValidatedCheckout,
        lines: &[CartLine],
        settings: &CheckoutSettings,
    ) -> Self {
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|line| OrderItem::from_line(line, settings))
            .collect();
        let subtotal: Decimal = items.iter().map(|item| item.line_total).sum();
        let delivery_fee = delivery_fee(validated.fulfillment.kind(), settings);

        Self {
            items,
            customer: validated.customer,
            fulfillment: validated.fulfillment,
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
            currency: settings.currency,
            payment_method: validated.payment_method,
            discount_code: validated.discount_code,
        }
    }
}
