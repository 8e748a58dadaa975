//! Subcommands of the `verger` binary.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod favorites;
pub mod orders;
pub mod zones;

use rust_decimal::Decimal;
use thiserror::Error;

use verger_core::{CurrencyCode, Price};
use verger_storefront::auth::Access;
use verger_storefront::error::AppError;
use verger_storefront::state::AppState;

pub use account::AccountAction;
pub use cart::CartAction;
pub use catalog::CatalogAction;
pub use favorites::FavoritesAction;
pub use orders::OrdersAction;
pub use zones::ZonesAction;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A storefront operation failed.
    #[error("{}", .0.user_message())]
    App(AppError),

    /// The command needs a signed-in account.
    #[error("Please sign in first with `verger account login` (redirect: {0})")]
    LoginRequired(String),

    /// Bad command-line input.
    #[error("{0}")]
    Usage(String),
}

impl From<AppError> for CommandError {
    fn from(err: AppError) -> Self {
        err.report();
        Self::App(err)
    }
}

/// Convert any storefront error, reporting it on the way.
pub fn app_error(err: impl Into<AppError>) -> CommandError {
    CommandError::from(err.into())
}

/// Resolve the session and gate a protected path the way the storefront
/// router does.
pub async fn require_access(state: &AppState, path: &str) -> Result<(), CommandError> {
    match state.session().on_navigation(path).await {
        Access::Allow => Ok(()),
        // on_navigation always resolves the session first
        Access::Pending => Err(CommandError::Usage(
            "Session could not be resolved".to_string(),
        )),
        Access::RedirectToLogin(redirect) => Err(CommandError::LoginRequired(redirect.location)),
    }
}

/// Format an amount with its currency symbol.
pub fn money(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).to_string()
}
