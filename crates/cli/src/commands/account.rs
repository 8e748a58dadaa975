//! Account commands.
//!
//! # Usage
//!
//! ```bash
//! verger account register -n "Marie Curie" -e marie@example.fr -p 'correct horse'
//! verger account login -e marie@example.fr -p 'correct horse'
//! verger account whoami
//! verger account update --phone 0601020304
//! verger account logout
//! ```

use clap::Subcommand;

use verger_storefront::api::ProfileUpdate;
use verger_storefront::auth::SessionState;
use verger_storefront::models::UserProfile;
use verger_storefront::navigation::LOGIN_PATH;
use verger_storefront::state::AppState;

use super::{CommandError, app_error, require_access};
use crate::console;

const ACCOUNT_PATH: &str = "/account";

#[derive(Subcommand)]
pub enum AccountAction {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(short, long)]
        password: String,
    },
    /// Sign out (the cart is kept)
    Logout,
    /// Show the signed-in profile
    Whoami,
    /// Update the profile
    Update {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Request a password reset email
    Forgot {
        #[arg(short, long)]
        email: String,
    },
}

pub async fn run(state: &AppState, action: AccountAction) -> Result<(), CommandError> {
    let session = state.session();

    match action {
        AccountAction::Login { email, password } => {
            let profile = session.login(&email, &password).await.map_err(app_error)?;
            console::line(&format!("Welcome back, {}", profile.name));
        }
        AccountAction::Register {
            name,
            email,
            phone,
            password,
        } => {
            let profile = session
                .register(&name, &email, phone.as_deref(), &password)
                .await
                .map_err(app_error)?;
            console::line(&format!("Welcome, {}", profile.name));
        }
        AccountAction::Logout => {
            session.logout();
            console::line("Signed out");
        }
        AccountAction::Whoami => match session.reconcile().await {
            SessionState::Authenticated(profile) => print_profile(&profile),
            SessionState::Indeterminate | SessionState::Unauthenticated => {
                console::line(&format!("Not signed in (see {LOGIN_PATH})"));
            }
        },
        AccountAction::Update { name, phone } => {
            if name.is_none() && phone.is_none() {
                return Err(CommandError::Usage(
                    "Nothing to update, pass --name or --phone".to_string(),
                ));
            }
            require_access(state, ACCOUNT_PATH).await?;

            let profile = session
                .update_profile(&ProfileUpdate { name, phone })
                .await
                .map_err(app_error)?;
            print_profile(&profile);
        }
        AccountAction::Forgot { email } => {
            session.forgot_password(&email).await.map_err(app_error)?;
            console::line("If an account exists for this address, a reset link is on its way");
        }
    }
    Ok(())
}

fn print_profile(profile: &UserProfile) {
    console::line(&format!("{} <{}>", profile.name, profile.email));
    if let Some(phone) = &profile.phone {
        console::line(&format!("Phone: {phone}"));
    }
    console::line(&format!("Loyalty points: {}", profile.loyalty_points));
}
