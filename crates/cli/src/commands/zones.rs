//! Delivery zone lookups.
//!
//! # Usage
//!
//! ```bash
//! verger zones list
//! verger zones check 94 300
//! verger zones suggest vinc
//! ```

use clap::Subcommand;

use verger_storefront::zones::ZoneDirectory;

use crate::console;

#[derive(Subcommand)]
pub enum ZonesAction {
    /// List every postal code we deliver to
    List,
    /// Check whether a postal code is served
    Check {
        /// Postal code (whitespace is ignored)
        #[arg(num_args = 1.., required = true)]
        code: Vec<String>,
    },
    /// Suggest zones for a partial postal code or city name
    Suggest {
        /// At least two characters
        query: String,
    },
}

pub fn run(action: &ZonesAction) {
    let zones = ZoneDirectory::default();

    match action {
        ZonesAction::List => {
            for zone in zones.zones() {
                console::line(&format!("{}  {}", zone.postal_code, zone.city));
            }
        }
        ZonesAction::Check { code } => {
            let code = code.concat();
            match zones.zone_for_code(&code) {
                Some(zone) => console::line(&format!(
                    "{} ({}) is in our delivery area",
                    zone.postal_code, zone.city
                )),
                None => console::line(&format!("Sorry, we do not deliver to {code} yet")),
            }
        }
        ZonesAction::Suggest { query } => {
            let suggestions = zones.suggestions_for(query);
            if suggestions.is_empty() {
                console::line("No matching zones");
            }
            for zone in suggestions {
                console::line(&format!("{}  {}", zone.postal_code, zone.city));
            }
        }
    }
}
