//! Catalog browsing.

use clap::Subcommand;

use verger_core::{CurrencyCode, ProductId};
use verger_storefront::api::{Product, ProductQuery};
use verger_storefront::state::AppState;

use super::{CommandError, app_error, money};
use crate::console;

#[derive(Subcommand)]
pub enum CatalogAction {
    /// List products
    List {
        /// Category slug (e.g., fruits)
        #[arg(short, long)]
        category: Option<String>,
        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Products per page
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show one product with its variants
    Show {
        /// Product ID
        id: String,
    },
}

pub async fn run(state: &AppState, action: CatalogAction) -> Result<(), CommandError> {
    let currency = state.config().checkout.currency;

    match action {
        CatalogAction::List {
            category,
            search,
            page,
            limit,
        } => {
            let query = ProductQuery {
                category,
                search,
                page: Some(page),
                limit,
            };
            let results = state
                .backends()
                .catalog
                .list_products(&query)
                .await
                .map_err(app_error)?;

            for product in &results.items {
                console::line(&summary(product, currency));
            }
            console::line(&format!(
                "Page {}/{} ({} products)",
                results.page, results.total_pages, results.total
            ));
        }
        CatalogAction::Show { id } => {
            let product = state
                .backends()
                .catalog
                .product(&ProductId::new(id))
                .await
                .map_err(app_error)?;

            console::line(&format!("{} [{}]", product.title, product.category));
            if !product.description.is_empty() {
                console::line(&product.description);
            }
            for variant in &product.variants {
                console::line(&format!(
                    "  {}  {}  {} per {}",
                    variant.id,
                    variant.descriptor(),
                    money(variant.price, currency),
                    variant.unit
                ));
            }
            if state.cart().is_favorite(&product.id) {
                console::line("♥ In your favorites");
            }
        }
    }
    Ok(())
}

fn summary(product: &Product, currency: CurrencyCode) -> String {
    let price = product
        .price_from()
        .map_or_else(|| "unavailable".to_string(), |p| format!("from {}", money(p, currency)));
    format!("{}  {}  {price}", product.id, product.title)
}
