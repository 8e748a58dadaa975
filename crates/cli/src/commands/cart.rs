//! Cart commands.
//!
//! The cart lives in the local state directory; only `add` talks to the
//! backend, to fetch the product being added.

use clap::Subcommand;

use verger_core::{ProductId, VariantId};
use verger_storefront::state::AppState;

use super::{CommandError, app_error, money};
use crate::console;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show cart lines and the total
    Show,
    /// Add a product variant to the cart
    Add {
        /// Product ID
        product: String,
        /// Variant ID (optional for single-variant products)
        #[arg(short, long)]
        variant: Option<String>,
        /// Number of units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a line (0 removes it)
    Set {
        product: String,
        variant: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { product: String, variant: String },
    /// Empty the cart
    Clear,
}

pub async fn run(state: &AppState, action: CartAction) -> Result<(), CommandError> {
    let cart = state.cart();

    match action {
        CartAction::Show => show(state),
        CartAction::Add {
            product,
            variant,
            quantity,
        } => {
            let product = state
                .backends()
                .catalog
                .product(&ProductId::new(product))
                .await
                .map_err(app_error)?;

            let variant = match (variant, product.variants.as_slice()) {
                (Some(id), _) => product.variant(&VariantId::new(id.as_str())).ok_or_else(|| {
                    CommandError::Usage(format!("{} has no variant {id}", product.title))
                })?,
                (None, [only]) => only,
                (None, []) => {
                    return Err(CommandError::Usage(format!(
                        "{} is not available",
                        product.title
                    )));
                }
                (None, _) => {
                    return Err(CommandError::Usage(format!(
                        "{} has several variants, pick one with --variant",
                        product.title
                    )));
                }
            };

            for _ in 0..quantity {
                cart.add_to_cart(&product, variant);
            }
            console::line(&format!(
                "Added {quantity} × {} ({})",
                product.title,
                variant.descriptor()
            ));
        }
        CartAction::Set {
            product,
            variant,
            quantity,
        } => {
            cart.update_quantity(
                &ProductId::new(product),
                &VariantId::new(variant),
                quantity,
            );
            show(state);
        }
        CartAction::Remove { product, variant } => {
            cart.remove_from_cart(&ProductId::new(product), &VariantId::new(variant));
            show(state);
        }
        CartAction::Clear => {
            cart.clear_cart();
            console::line("Cart emptied");
        }
    }
    Ok(())
}

fn show(state: &AppState) {
    let cart = state.cart();
    let currency = state.config().checkout.currency;

    if cart.is_empty() {
        console::line("Your cart is empty");
        return;
    }
    for line in cart.lines() {
        console::line(&format!(
            "{:>3} × {} ({})  {}",
            line.quantity,
            line.product.title,
            line.variant.descriptor(),
            money(line.line_total(), currency)
        ));
    }
    console::line(&format!(
        "{} items, total {}",
        cart.item_count(),
        money(cart.cart_total(), currency)
    ));
}
