//! Cart and favorites.
//!
//! The cart is entirely client-side: lines live in the persisted snapshot and
//! are only turned into an order at checkout. Totals are recomputed from the
//! lines on every read.

mod line;

pub use line::CartLine;

use rust_decimal::Decimal;

use verger_core::{ProductId, VariantId};

use crate::api::{Product, Variant};
use crate::error::add_breadcrumb;
use crate::store::PersistedStore;

/// Cart and favorites operations over the shared snapshot.
///
/// Every mutation is persisted before it returns. Write failures are logged
/// and never surface to the caller.
#[derive(Debug, Clone)]
pub struct CartStore {
    store: PersistedStore,
}

impl CartStore {
    /// Wrap the shared snapshot.
    #[must_use]
    pub const fn new(store: PersistedStore) -> Self {
        Self { store }
    }

    /// Add one unit of `variant`.
    ///
    /// An existing line for the same product and variant is incremented;
    /// otherwise a new line with quantity 1 is appended.
    pub fn add_to_cart(&self, product: &Product, variant: &Variant) {
        debug_assert!(
            product.variant(&variant.id).is_some(),
            "variant {} does not belong to product {}",
            variant.id,
            product.id
        );

        let quantity = self.store.update(|snapshot| {
            if let Some(line) = snapshot
                .cart
                .iter_mut()
                .find(|line| line.matches(&product.id, &variant.id))
            {
                line.quantity = line.quantity.saturating_add(1);
                line.quantity
            } else {
                snapshot
                    .cart
                    .push(CartLine::new(product.clone(), variant.clone()));
                1
            }
        });

        add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[
                ("product_id", product.id.as_str()),
                ("variant_id", variant.id.as_str()),
            ]),
        );
        tracing::debug!(
            product_id = %product.id,
            variant_id = %variant.id,
            quantity,
            "Added to cart"
        );
    }

    /// Set the quantity of a line. Zero or less removes it; absent lines are
    /// left alone.
    pub fn update_quantity(&self, product_id: &ProductId, variant_id: &VariantId, quantity: i64) {
        let Ok(quantity) = u32::try_from(quantity) else {
            if quantity <= 0 {
                self.remove_from_cart(product_id, variant_id);
            } else {
                tracing::warn!(quantity, "Ignoring out-of-range cart quantity");
            }
            return;
        };
        if quantity == 0 {
            self.remove_from_cart(product_id, variant_id);
            return;
        }

        let updated = self.store.update(|snapshot| {
            let Some(line) = snapshot
                .cart
                .iter_mut()
                .find(|line| line.matches(product_id, variant_id))
            else {
                return false;
            };
            line.quantity = quantity;
            true
        });
        if updated {
            tracing::debug!(%product_id, %variant_id, quantity, "Updated cart quantity");
        }
    }

    /// Remove a line. Idempotent.
    pub fn remove_from_cart(&self, product_id: &ProductId, variant_id: &VariantId) {
        let removed = self.store.update(|snapshot| {
            let before = snapshot.cart.len();
            snapshot
                .cart
                .retain(|line| !line.matches(product_id, variant_id));
            before != snapshot.cart.len()
        });
        if removed {
            add_breadcrumb(
                "cart",
                "Removed from cart",
                Some(&[
                    ("product_id", product_id.as_str()),
                    ("variant_id", variant_id.as_str()),
                ]),
            );
            tracing::debug!(%product_id, %variant_id, "Removed from cart");
        }
    }

    /// Empty the cart.
    pub fn clear_cart(&self) {
        self.store.update(|snapshot| snapshot.cart.clear());
        tracing::debug!("Cleared cart");
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.store
            .read(|snapshot| snapshot.cart.iter().map(CartLine::line_total).sum())
    }

    /// Copy of the cart lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.store.read(|snapshot| snapshot.cart.clone())
    }

    /// The line for a product and variant.
    #[must_use]
    pub fn line(&self, product_id: &ProductId, variant_id: &VariantId) -> Option<CartLine> {
        self.store.read(|snapshot| {
            snapshot
                .cart
                .iter()
                .find(|line| line.matches(product_id, variant_id))
                .cloned()
        })
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.store.read(|snapshot| {
            snapshot
                .cart
                .iter()
                .map(|line| u64::from(line.quantity))
                .sum()
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.read(|snapshot| snapshot.cart.is_empty())
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Mark a product as favorite. No-op if it already is.
    pub fn add_to_favorites(&self, product: &Product) {
        let added = self.store.update(|snapshot| {
            if snapshot.favorites.iter().any(|p| p.id == product.id) {
                false
            } else {
                snapshot.favorites.push(product.clone());
                true
            }
        });
        if added {
            tracing::debug!(product_id = %product.id, "Added to favorites");
        }
    }

    /// Unmark a favorite product. Idempotent.
    pub fn remove_from_favorites(&self, product_id: &ProductId) {
        self.store
            .update(|snapshot| snapshot.favorites.retain(|p| &p.id != product_id));
    }

    #[must_use]
    pub fn is_favorite(&self, product_id: &ProductId) -> bool {
        self.store
            .read(|snapshot| snapshot.favorites.iter().any(|p| &p.id == product_id))
    }

    /// Flip the favorite mark. Returns whether the product is now a favorite.
    pub fn toggle_favorite(&self, product: &Product) -> bool {
        self.store.update(|snapshot| {
            let before = snapshot.favorites.len();
            snapshot.favorites.retain(|p| p.id != product.id);
            if snapshot.favorites.len() == before {
                snapshot.favorites.push(product.clone());
                true
            } else {
                false
            }
        })
    }

    /// Favorite products, in the order they were added.
    #[must_use]
    pub fn favorites(&self) -> Vec<Product> {
        self.store.read(|snapshot| snapshot.favorites.clone())
    }
}
