//! Cash checkout from the terminal.
//!
//! Card and PayPal payments need the provider widgets of the web front end,
//! so the terminal only places cash orders.
//!
//! # Usage
//!
//! ```bash
//! verger checkout pickup --location montreuil
//! verger checkout --phone 0601020304 delivery --street "1 rue de Fontenay" \
//!     --postal-code 94300 --slot morning
//! ```

use clap::{Args, Subcommand};

use verger_core::{FulfillmentType, PaymentMethod};
use verger_storefront::checkout::{
    Checkout, CheckoutError, PickupLocation, SubmitOutcome, TimeSlot,
};
use verger_storefront::error::AppError;
use verger_storefront::state::AppState;

use super::orders::print_order;
use super::{CommandError, app_error, require_access};
use crate::console;

const CHECKOUT_PATH: &str = "/checkout";

#[derive(Args)]
pub struct CheckoutArgs {
    /// Full name (defaults to the profile name)
    #[arg(long)]
    name: Option<String>,
    /// Contact email (defaults to the profile email)
    #[arg(long)]
    email: Option<String>,
    /// Contact phone (defaults to the profile phone)
    #[arg(long)]
    phone: Option<String>,
    /// Payment method; only cash is available here
    #[arg(long, default_value = "cash")]
    payment: PaymentMethod,
    #[command(subcommand)]
    fulfillment: FulfillmentArgs,
}

#[derive(Subcommand)]
enum FulfillmentArgs {
    /// Pick the order up in store
    Pickup {
        /// vincennes-centre, saint-mande or montreuil
        #[arg(short, long)]
        location: PickupLocation,
    },
    /// Deliver to an address in a delivery zone
    Delivery {
        #[arg(long)]
        street: String,
        #[arg(long)]
        postal_code: String,
        /// City, when the postal code does not fill it in
        #[arg(long)]
        city: Option<String>,
        /// morning, afternoon or evening
        #[arg(long)]
        slot: Option<TimeSlot>,
    },
}

pub async fn run(state: &AppState, args: CheckoutArgs) -> Result<(), CommandError> {
    if args.payment != PaymentMethod::Cash {
        return Err(CommandError::Usage(format!(
            "{} payments are only available on the website, use --payment cash",
            args.payment
        )));
    }
    require_access(state, CHECKOUT_PATH).await?;

    let mut checkout = state.checkout();
    fill_draft(&mut checkout, args).map_err(app_error)?;

    let outcome = checkout.submit().await;
    match outcome {
        Ok(SubmitOutcome::Completed(completed)) => {
            print_order(&completed.order);
            console::line(&format!(
                "Track it under {}",
                completed.redirect.location
            ));
            Ok(())
        }
        Ok(SubmitOutcome::AwaitingPayment(method)) => Err(CommandError::Usage(format!(
            "{method} payment cannot be completed in the terminal"
        ))),
        Err(CheckoutError::Validation(errors)) => {
            for error in errors.iter() {
                console::error(&format!("{}: {}", error.field, error.message));
            }
            Err(CommandError::App(AppError::Checkout(CheckoutError::Validation(
                errors,
            ))))
        }
        Err(e) => Err(app_error(e)),
    }
}

fn fill_draft(checkout: &mut Checkout, args: CheckoutArgs) -> Result<(), CheckoutError> {
    let CheckoutArgs {
        name,
        email,
        phone,
        payment,
        fulfillment,
    } = args;

    let draft = checkout.draft_mut()?;
    if let Some(name) = name {
        draft.full_name = name;
    }
    if let Some(email) = email {
        draft.email = email;
    }
    if let Some(phone) = phone {
        draft.phone = phone;
    }

    match fulfillment {
        FulfillmentArgs::Pickup { location } => {
            draft.set_fulfillment(FulfillmentType::Store);
            draft.set_pickup_location(Some(location));
        }
        FulfillmentArgs::Delivery {
            street,
            postal_code,
            city,
            slot,
        } => {
            draft.set_fulfillment(FulfillmentType::Delivery);
            draft.set_street(street);
            draft.set_time_slot(slot);

            checkout.enter_postal_code(&postal_code)?;
            let draft = checkout.draft_mut()?;
            if !draft.is_city_locked() {
                for zone in draft.suggestions() {
                    console::line(&format!(
                        "Did you mean {} ({})?",
                        zone.postal_code, zone.city
                    ));
                }
                if let Some(city) = city {
                    draft.set_city(city);
                }
            }
        }
    }

    checkout.draft_mut()?.set_payment_method(payment);
    Ok(())
}
