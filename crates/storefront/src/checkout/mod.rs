//! Checkout: the draft form, its validation, and order submission.
//!
//! [`CheckoutDraft`] holds what the shopper typed. [`validate`] turns it into
//! a [`ValidatedCheckout`], which [`DraftOrder::build`](crate::api::DraftOrder::build)
//! freezes together with the cart. [`Checkout`] drives the whole sequence,
//! including the pause for external payment confirmation.

mod draft;
mod fulfillment;
mod machine;
mod order;
mod payment;
mod validation;

pub use draft::CheckoutDraft;
pub use fulfillment::{FulfillmentDetails, PickupLocation, TimeSlot};
pub use machine::{
    Checkout, CheckoutError, CheckoutState, CompletedCheckout, PaymentHandoff, PendingPayment,
    SubmitOutcome,
};
pub use order::delivery_fee;
pub use payment::{CardPaymentWidget, PayPalWidget, PaymentConfirmation, PaymentFailure};
pub use validation::{
    Field, FieldError, MIN_NAME_CHARS, MIN_PHONE_CHARS, ValidatedCheckout, ValidationErrors,
    validate,
};
