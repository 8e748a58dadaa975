//! Verger CLI - terminal front end for the storefront.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog and fill the cart
//! verger catalog list --category fruits
//! verger cart add p-42 --variant v-1
//!
//! # Check a delivery postal code
//! verger zones check 94300
//!
//! # Sign in and check out with cash on delivery
//! verger account login -e marie@example.fr -p '...'
//! verger checkout --name "Marie Curie" --email marie@example.fr --phone 0601020304 \
//!     delivery --street "1 rue de Fontenay" --postal-code 94300
//! ```
//!
//! # Commands
//!
//! - `zones` - Delivery zones and postal code suggestions
//! - `catalog` - Browse products
//! - `cart` - Show and edit the cart
//! - `favorites` - Show and toggle favorites
//! - `account` - Sign in, register, sign out, profile
//! - `orders` - Order history
//! - `checkout` - Place a cash order for the cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use verger_storefront::config::StorefrontConfig;
use verger_storefront::state::AppState;

mod commands;
mod console;

use commands::checkout::CheckoutArgs;
use commands::{
    AccountAction, CartAction, CatalogAction, FavoritesAction, OrdersAction, ZonesAction,
};

#[derive(Parser)]
#[command(name = "verger")]
#[command(author, version, about = "Verger storefront in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delivery zones
    Zones {
        #[command(subcommand)]
        action: ZonesAction,
    },
    /// Browse the catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show and toggle favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Sign in, register and manage the profile
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Place a cash order for the current cart
    Checkout(CheckoutArgs),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Zones are static; everything else needs the backend configuration
    if let Commands::Zones { action } = &cli.command {
        tracing_subscriber::fmt::init();
        commands::zones::run(action);
        return;
    }

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            console::error(&format!("Configuration error: {e}"));
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to warnings only so command output stays readable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "verger_storefront=warn,verger_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = run(cli, config).await;

    if let Err(e) = result {
        tracing::debug!("Command failed: {e}");
        console::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::with_notifier(config, Arc::new(console::ConsoleNotifier))?;
    state.start().await;

    match cli.command {
        Commands::Zones { action } => commands::zones::run(&action),
        Commands::Catalog { action } => commands::catalog::run(&state, action).await?,
        Commands::Cart { action } => commands::cart::run(&state, action).await?,
        Commands::Favorites { action } => commands::favorites::run(&state, action).await?,
        Commands::Account { action } => commands::account::run(&state, action).await?,
        Commands::Orders { action } => commands::orders::run(&state, action).await?,
        Commands::Checkout(args) => commands::checkout::run(&state, args).await?,
    }
    Ok(())
}
