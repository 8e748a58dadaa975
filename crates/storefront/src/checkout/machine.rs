//! The checkout state machine.
//!
//! ```text
//! Editing ──submit──▶ Submitting ──cash──▶ Completed
//!    ▲                    │
//!    │ failure / cancel   │ card, paypal
//!    └────────────── AwaitingPayment ──confirmed──▶ Completed
//! ```
//!
//! Nothing is sent to the order endpoint for card or PayPal payments until
//! the provider confirms. The cart is only cleared once the backend has
//! created the order.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use verger_core::PaymentMethod;

use super::draft::CheckoutDraft;
use super::payment::{CardPaymentWidget, PayPalWidget, PaymentConfirmation, PaymentFailure};
use super::validation::{self, ValidationErrors};
use crate::api::{ApiError, DraftOrder, NewOrder, Order, OrderApi, PaymentApi, PaymentIntent};
use crate::cart::CartStore;
use crate::config::CheckoutSettings;
use crate::error::{add_breadcrumb, capture_error};
use crate::navigation::{ORDER_HISTORY_PATH, Redirect};
use crate::notify::{Notification, Notifier};
use crate::zones::ZoneDirectory;

/// Errors returned by checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The form has invalid fields.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// A backend call failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// The payment provider refused the payment.
    #[error("payment failed: {0}")]
    Payment(#[from] PaymentFailure),

    /// The operation does not apply to the current state.
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}

impl CheckoutError {
    /// Message safe to show to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(_) => "Please correct the highlighted fields".to_string(),
            Self::Api(err) => err.user_message(),
            Self::Payment(failure) => failure.message.clone(),
            Self::InvalidState { .. } => "This checkout step is no longer available".to_string(),
        }
    }
}

/// Provider-specific data while a payment is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentHandoff {
    /// Card payment intent to hand to the card widget.
    Card { intent: PaymentIntent },
    /// PayPal order, once created for the buttons.
    PayPal { provider_order_id: Option<String> },
}

/// An order waiting for external payment confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPayment {
    /// The order body, frozen at submission.
    pub draft_order: DraftOrder,
    pub handoff: PaymentHandoff,
    /// Error shown next to the payment widget.
    pub inline_error: Option<String>,
    /// Provider reference once the payment went through. Set when the order
    /// creation after a successful payment failed and can be retried.
    pub confirmed_reference: Option<String>,
}

impl PendingPayment {
    #[must_use]
    pub const fn method(&self) -> PaymentMethod {
        match self.handoff {
            PaymentHandoff::Card { .. } => PaymentMethod::Card,
            PaymentHandoff::PayPal { .. } => PaymentMethod::PayPal,
        }
    }
}

/// Where the checkout stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Editing,
    Submitting,
    AwaitingPayment(PendingPayment),
    Completed(Box<Order>),
}

impl CheckoutState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Editing => "editing",
            Self::Submitting => "submitting",
            Self::AwaitingPayment(_) => "awaiting payment",
            Self::Completed(_) => "completed",
        }
    }
}

/// A created order and where to send the shopper next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub order: Order,
    pub redirect: Redirect,
}

/// Result of [`Checkout::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Cash order created.
    Completed(CompletedCheckout),
    /// Waiting for the card widget or the PayPal buttons.
    AwaitingPayment(PaymentMethod),
}

/// One checkout session: the draft form plus the submission state machine.
pub struct Checkout {
    draft: CheckoutDraft,
    state: CheckoutState,
    cart: CartStore,
    zones: ZoneDirectory,
    orders: Arc<dyn OrderApi>,
    payments: Arc<dyn PaymentApi>,
    notifier: Arc<dyn Notifier>,
    settings: CheckoutSettings,
}

impl Checkout {
    /// Start a checkout over the current cart.
    #[must_use]
    pub fn new(
        cart: CartStore,
        zones: ZoneDirectory,
        orders: Arc<dyn OrderApi>,
        payments: Arc<dyn PaymentApi>,
        notifier: Arc<dyn Notifier>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            draft: CheckoutDraft::new(),
            state: CheckoutState::Editing,
            cart,
            zones,
            orders,
            payments,
            notifier,
            settings,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    #[must_use]
    pub const fn draft(&self) -> &CheckoutDraft {
        &self.draft
    }

    /// The draft, for editing.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidState`] outside of
    /// [`CheckoutState::Editing`].
    pub fn draft_mut(&mut self) -> Result<&mut CheckoutDraft, CheckoutError> {
        self.expect_editing("edit the form")?;
        Ok(&mut self.draft)
    }

    /// The delivery zones used for postal code entry and validation.
    #[must_use]
    pub const fn zones(&self) -> &ZoneDirectory {
        &self.zones
    }

    /// Enter a postal code into the draft against this checkout's zones.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidState`] outside of editing.
    pub fn enter_postal_code(&mut self, code: &str) -> Result<(), CheckoutError> {
        self.expect_editing("edit the form")?;
        self.draft.enter_postal_code(code, &self.zones);
        Ok(())
    }

    /// The pending payment, while awaiting one.
    #[must_use]
    pub const fn pending_payment(&self) -> Option<&PendingPayment> {
        match &self.state {
            CheckoutState::AwaitingPayment(pending) => Some(pending),
            _ => None,
        }
    }

    fn expect_editing(&self, action: &'static str) -> Result<(), CheckoutError> {
        match self.state {
            CheckoutState::Editing => Ok(()),
            ref other => Err(CheckoutError::InvalidState {
                action,
                state: other.name(),
            }),
        }
    }

    fn pending_mut(&mut self, action: &'static str) -> Result<&mut PendingPayment, CheckoutError> {
        match &mut self.state {
            CheckoutState::AwaitingPayment(pending) => Ok(pending),
            other => Err(CheckoutError::InvalidState {
                action,
                state: other.name(),
            }),
        }
    }

    /// The pending payment, provided no payment went through yet. Once one
    /// has, [`retry_paid_order`](Self::retry_paid_order) is the only way on.
    fn unpaid_mut(&mut self, action: &'static str) -> Result<&mut PendingPayment, CheckoutError> {
        let pending = self.pending_mut(action)?;
        if pending.confirmed_reference.is_some() {
            return Err(CheckoutError::InvalidState {
                action,
                state: "a confirmed payment awaits its order",
            });
        }
        Ok(pending)
    }

    /// Validate the draft and submit it.
    ///
    /// Cash orders are created right away. Card payments get a payment
    /// intent and PayPal payments wait for the buttons; both leave the
    /// checkout in [`CheckoutState::AwaitingPayment`].
    ///
    /// # Errors
    ///
    /// Returns validation errors without leaving editing, or the backend
    /// error after notifying the shopper and returning to editing.
    #[instrument(skip(self), fields(payment_method = %self.draft.payment_method()))]
    pub async fn submit(&mut self) -> Result<SubmitOutcome, CheckoutError> {
        self.expect_editing("submit")?;

        let validated =
            match validation::validate(&self.draft, &self.zones, self.cart.is_empty()) {
                Ok(validated) => validated,
                Err(errors) => {
                    tracing::debug!(errors = %errors, "Checkout validation failed");
                    self.notifier
                        .notify(Notification::error("Please correct the highlighted fields"));
                    return Err(CheckoutError::Validation(errors));
                }
            };

        self.state = CheckoutState::Submitting;
        let draft_order = DraftOrder::build(validated, &self.cart.lines(), &self.settings);
        let method = draft_order.payment_method;
        add_breadcrumb(
            "checkout",
            "Submitting order",
            Some(&[
                ("payment_method", method.as_str()),
                ("fulfillment", draft_order.fulfillment.kind().as_str()),
            ]),
        );

        match method {
            PaymentMethod::Cash => {
                let created = self
                    .orders
                    .create_order(&NewOrder::pending(draft_order))
                    .await;
                match created {
                    Ok(order) => Ok(SubmitOutcome::Completed(self.finalize(order))),
                    Err(e) => Err(self.fail(e.into())),
                }
            }
            PaymentMethod::Card => {
                let intent = self.payments.create_card_intent(&draft_order).await;
                match intent {
                    Ok(intent) => {
                        self.await_payment(draft_order, PaymentHandoff::Card { intent });
                        Ok(SubmitOutcome::AwaitingPayment(method))
                    }
                    Err(e) => Err(self.fail(e.into())),
                }
            }
            PaymentMethod::PayPal => {
                self.await_payment(
                    draft_order,
                    PaymentHandoff::PayPal {
                        provider_order_id: None,
                    },
                );
                Ok(SubmitOutcome::AwaitingPayment(method))
            }
        }
    }

    fn await_payment(&mut self, draft_order: DraftOrder, handoff: PaymentHandoff) {
        tracing::info!(total = %draft_order.total, "Awaiting payment confirmation");
        self.state = CheckoutState::AwaitingPayment(PendingPayment {
            draft_order,
            handoff,
            inline_error: None,
            confirmed_reference: None,
        });
    }

    /// Clear the cart, notify, and point the shopper at their orders.
    fn finalize(&mut self, order: Order) -> CompletedCheckout {
        self.cart.clear_cart();
        self.notifier
            .notify(Notification::success(format!("Order {} confirmed", order.id)));
        add_breadcrumb("checkout", "Order created", Some(&[("order_id", order.id.as_str())]));
        tracing::info!(
            order_id = %order.id,
            status = %order.status,
            total = %order.draft.total,
            "Order created"
        );

        self.state = CheckoutState::Completed(Box::new(order.clone()));
        CompletedCheckout {
            order,
            redirect: Redirect::after(ORDER_HISTORY_PATH, self.settings.redirect_delay),
        }
    }

    /// Notify and return to editing.
    fn fail(&mut self, error: CheckoutError) -> CheckoutError {
        if let CheckoutError::Api(api) = &error {
            capture_error(api);
        }
        tracing::warn!(error = %error, "Checkout submission failed");
        self.notifier.notify(Notification::error(error.user_message()));
        self.state = CheckoutState::Editing;
        error
    }

    /// Record an inline payment error and keep awaiting payment.
    fn fail_inline(&mut self, error: CheckoutError) -> CheckoutError {
        if let Ok(pending) = self.pending_mut("record a payment error") {
            pending.inline_error = Some(error.user_message());
        }
        tracing::warn!(error = %error, "Payment step failed");
        error
    }

    // =========================================================================
    // Payment callbacks
    // =========================================================================

    /// The provider confirmed the payment: create the paid order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidState`] when no payment is pending or
    /// one was already confirmed. If order creation fails, the checkout
    /// keeps awaiting payment with an inline error and the confirmation, so
    /// [`retry_paid_order`](Self::retry_paid_order) can submit it again
    /// without charging twice.
    #[instrument(skip(self))]
    pub async fn on_payment_confirmed(
        &mut self,
        confirmation: PaymentConfirmation,
    ) -> Result<CompletedCheckout, CheckoutError> {
        let pending = self.unpaid_mut("confirm a payment")?;
        pending.confirmed_reference = Some(confirmation.reference.clone());
        pending.inline_error = None;
        let draft_order = pending.draft_order.clone();

        self.create_paid_order(draft_order, confirmation.reference)
            .await
    }

    /// Submit the paid order again after a failed creation.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidState`] unless a confirmed payment is
    /// pending, or the backend error.
    pub async fn retry_paid_order(&mut self) -> Result<CompletedCheckout, CheckoutError> {
        let pending = self.pending_mut("retry the order")?;
        let Some(reference) = pending.confirmed_reference.clone() else {
            return Err(CheckoutError::InvalidState {
                action: "retry the order",
                state: "awaiting an unconfirmed payment",
            });
        };
        let draft_order = pending.draft_order.clone();
        self.create_paid_order(draft_order, reference).await
    }

    async fn create_paid_order(
        &mut self,
        draft_order: DraftOrder,
        reference: String,
    ) -> Result<CompletedCheckout, CheckoutError> {
        let created = self
            .orders
            .create_order(&NewOrder::paid(draft_order, reference.clone()))
            .await;
        match created {
            Ok(order) => Ok(self.finalize(order)),
            Err(e) => {
                capture_error(&e);
                tracing::error!(
                    error = %e,
                    payment_reference = %reference,
                    "Payment confirmed but order creation failed"
                );
                let error = CheckoutError::Api(e);
                self.notifier.notify(Notification::error(format!(
                    "Your payment went through but the order could not be saved: {}",
                    error.user_message()
                )));
                Err(self.fail_inline(error))
            }
        }
    }

    /// The payment widget reported a failure: show it inline and keep
    /// awaiting payment.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidState`] when no payment is pending.
    pub fn on_payment_failed(&mut self, failure: &PaymentFailure) -> Result<(), CheckoutError> {
        let pending = self.pending_mut("record a payment failure")?;
        pending.inline_error = Some(failure.message.clone());
        tracing::info!(reason = %failure.message, "Payment failed");
        Ok(())
    }

    /// Abandon the payment and go back to editing.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidState`] when no payment is pending.
    pub fn cancel_payment(&mut self) -> Result<(), CheckoutError> {
        let pending = self.pending_mut("cancel the payment")?;
        if let Some(reference) = &pending.confirmed_reference {
            tracing::error!(
                payment_reference = %reference,
                "Cancelled checkout after a confirmed payment"
            );
        }
        self.state = CheckoutState::Editing;
        self.notifier.notify(Notification::info("Payment cancelled"));
        Ok(())
    }

    /// Create the PayPal order the buttons need.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidState`] unless an unpaid PayPal
    /// payment is pending, or the backend error (also shown inline).
    #[instrument(skip(self))]
    pub async fn create_paypal_order(&mut self) -> Result<String, CheckoutError> {
        let pending = self.unpaid_mut("create a PayPal order")?;
        if pending.method() != PaymentMethod::PayPal {
            return Err(CheckoutError::InvalidState {
                action: "create a PayPal order",
                state: "awaiting a card payment",
            });
        }
        let draft_order = pending.draft_order.clone();

        let created = self.payments.create_paypal_order(&draft_order).await;
        match created {
            Ok(provider_order) => {
                let pending = self.pending_mut("create a PayPal order")?;
                pending.handoff = PaymentHandoff::PayPal {
                    provider_order_id: Some(provider_order.id.clone()),
                };
                pending.inline_error = None;
                Ok(provider_order.id)
            }
            Err(e) => Err(self.fail_inline(e.into())),
        }
    }

    /// The shopper approved the PayPal order: capture it, then create the
    /// paid order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidState`] unless an unpaid PayPal
    /// payment is pending for `provider_order_id`, a payment failure for an
    /// incomplete capture, or the backend error. All of these keep the
    /// checkout awaiting payment.
    #[instrument(skip(self))]
    pub async fn on_paypal_approved(
        &mut self,
        provider_order_id: &str,
    ) -> Result<CompletedCheckout, CheckoutError> {
        const ACTION: &str = "capture a PayPal order";
        let pending = self.unpaid_mut(ACTION)?;
        let state = match &pending.handoff {
            PaymentHandoff::PayPal {
                provider_order_id: Some(expected),
            } if expected == provider_order_id => None,
            PaymentHandoff::PayPal { .. } => Some("awaiting another PayPal order"),
            PaymentHandoff::Card { .. } => Some("awaiting a card payment"),
        };
        if let Some(state) = state {
            tracing::warn!(provider_order_id, "Refusing to capture an unexpected PayPal order");
            return Err(CheckoutError::InvalidState {
                action: ACTION,
                state,
            });
        }

        let captured = self.payments.capture_paypal_order(provider_order_id).await;
        let capture = match captured {
            Ok(capture) => capture,
            Err(e) => return Err(self.fail_inline(e.into())),
        };
        if !capture.is_completed() {
            let failure = PaymentFailure::new(format!(
                "PayPal did not complete the payment (status {})",
                capture.status
            ));
            return Err(self.fail_inline(failure.into()));
        }

        self.on_payment_confirmed(PaymentConfirmation::new(capture.id))
            .await
    }

    // =========================================================================
    // Widget drivers
    // =========================================================================

    /// Hand the pending card intent to `widget` and act on its answer.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidState`] unless an unpaid card payment
    /// is pending, the widget's failure, or the order creation error.
    pub async fn confirm_card_payment(
        &mut self,
        widget: &dyn CardPaymentWidget,
    ) -> Result<CompletedCheckout, CheckoutError> {
        let pending = self.unpaid_mut("confirm a card payment")?;
        let PaymentHandoff::Card { intent } = &pending.handoff else {
            return Err(CheckoutError::InvalidState {
                action: "confirm a card payment",
                state: "awaiting a PayPal payment",
            });
        };
        let client_secret = intent.client_secret.clone();

        match widget.confirm(&client_secret).await {
            Ok(confirmation) => self.on_payment_confirmed(confirmation).await,
            Err(failure) => {
                self.on_payment_failed(&failure)?;
                Err(CheckoutError::Payment(failure))
            }
        }
    }

    /// Run the PayPal buttons: create the provider order, have `widget`
    /// approve it, then capture.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidState`] unless an unpaid PayPal
    /// payment is pending, the widget's failure, or a backend error.
    pub async fn pay_with_paypal(
        &mut self,
        widget: &dyn PayPalWidget,
    ) -> Result<CompletedCheckout, CheckoutError> {
        let provider_order_id = self.create_paypal_order().await?;
        match widget.approve(&provider_order_id).await {
            Ok(()) => self.on_paypal_approved(&provider_order_id).await,
            Err(failure) => {
                self.on_payment_failed(&failure)?;
                Err(CheckoutError::Payment(failure))
            }
        }
    }
}

impl std::fmt::Debug for Checkout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("state", &self.state.name())
            .field("draft", &self.draft)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
