//! Cart line type.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use verger_core::{ProductId, VariantId};

use crate::api::{Product, Variant};

/// One (product, variant, quantity) entry of the cart.
///
/// The product and variant are snapshots taken when the line was created;
/// they are not refreshed from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: Product,
    pub variant: Variant,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartLine {
    /// A new line with quantity 1.
    #[must_use]
    pub const fn new(product: Product, variant: Variant) -> Self {
        Self {
            product,
            variant,
            quantity: 1,
        }
    }

    /// `unit price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.variant.price * Decimal::from(self.quantity)
    }

    /// Whether this line is the one for `product_id` and `variant_id`.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, variant_id: &VariantId) -> bool {
        &self.product.id == product_id && &self.variant.id == variant_id
    }
}
