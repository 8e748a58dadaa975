//! Favorites commands.

use clap::Subcommand;

use verger_core::ProductId;
use verger_storefront::state::AppState;

use super::{CommandError, app_error};
use crate::console;

#[derive(Subcommand)]
pub enum FavoritesAction {
    /// List favorite products
    List,
    /// Add or remove a product from favorites
    Toggle {
        /// Product ID
        product: String,
    },
}

pub async fn run(state: &AppState, action: FavoritesAction) -> Result<(), CommandError> {
    let cart = state.cart();

    match action {
        FavoritesAction::List => {
            let favorites = cart.favorites();
            if favorites.is_empty() {
                console::line("No favorites yet");
            }
            for product in favorites {
                console::line(&format!("{}  {}", product.id, product.title));
            }
        }
        FavoritesAction::Toggle { product } => {
            let id = ProductId::new(product);
            let known = cart.favorites().into_iter().find(|p| p.id == id);
            let now_favorite = if let Some(known) = known {
                cart.toggle_favorite(&known)
            } else {
                let product = state
                    .backends()
                    .catalog
                    .product(&id)
                    .await
                    .map_err(app_error)?;
                cart.toggle_favorite(&product)
            };

            if now_favorite {
                console::line(&format!("{id} added to favorites"));
            } else {
                console::line(&format!("{id} removed from favorites"));
            }
        }
    }
    Ok(())
}
