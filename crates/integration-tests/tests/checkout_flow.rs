//! Integration tests for the checkout state machine.
//!
//! Covers validation, cash orders, and the card and `PayPal` payment
//! handoffs against the in-memory backend.

#![allow(clippy::unwrap_used)]

use verger_core::{FulfillmentType, OrderStatus, PaymentMethod};
use verger_integration_tests::{Call, FakeCardWidget, FakePayPalWidget, Harness, decimal};
use verger_storefront::checkout::{
    Checkout, CheckoutError, CheckoutState, Field, FulfillmentDetails, PaymentConfirmation,
    PaymentHandoff, PickupLocation, SubmitOutcome, TimeSlot,
};
use verger_storefront::navigation::ORDER_HISTORY_PATH;

// ============================================================================
// Helpers
// ============================================================================

fn fill_contact(checkout: &mut Checkout) {
    let draft = checkout.draft_mut().unwrap();
    draft.full_name = "Marie Curie".to_string();
    draft.email = "marie@example.fr".to_string();
    draft.phone = "0601020304".to_string();
}

fn fill_delivery(checkout: &mut Checkout, postal_code: &str) {
    fill_contact(checkout);
    let draft = checkout.draft_mut().unwrap();
    draft.set_fulfillment(FulfillmentType::Delivery);
    draft.set_street("1 rue de Fontenay");
    draft.set_time_slot(Some(TimeSlot::Morning));
    checkout.enter_postal_code(postal_code).unwrap();
}

fn delivery_checkout(h: &Harness, method: PaymentMethod) -> Checkout {
    let mut checkout = h.state.checkout();
    fill_delivery(&mut checkout, "94300");
    checkout.draft_mut().unwrap().set_payment_method(method);
    checkout
}

fn validation_errors(result: Result<SubmitOutcome, CheckoutError>) -> Vec<Field> {
    match result {
        Err(CheckoutError::Validation(errors)) => errors.iter().map(|e| e.field).collect(),
        other => panic!("expected validation errors, got {other:?}"),
    }
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_unknown_postal_code_never_creates_an_order() {
    let h = Harness::new();
    h.fill_reference_cart();
    let mut checkout = h.state.checkout();
    fill_delivery(&mut checkout, "00000");

    let fields = validation_errors(checkout.submit().await);

    assert!(fields.contains(&Field::PostalCode));
    assert!(h.backend.created_orders().is_empty());
    assert_eq!(checkout.state(), &CheckoutState::Editing);
    assert_eq!(h.state.cart().cart_total(), decimal("17.00"));
}

#[tokio::test]
async fn test_pickup_without_location_is_rejected() {
    let h = Harness::new();
    h.fill_reference_cart();
    let mut checkout = h.state.checkout();
    fill_contact(&mut checkout);
    checkout
        .draft_mut()
        .unwrap()
        .set_fulfillment(FulfillmentType::Store);

    let fields = validation_errors(checkout.submit().await);

    assert_eq!(fields, vec![Field::PickupLocation]);
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn test_empty_cart_and_contact_errors_are_reported_together() {
    let h = Harness::new();
    let mut checkout = h.state.checkout();
    {
        let draft = checkout.draft_mut().unwrap();
        draft.full_name = "M".to_string();
        draft.email = "not-an-email".to_string();
        draft.phone = "0601".to_string();
        draft.set_pickup_location(Some(PickupLocation::Montreuil));
    }

    let fields = validation_errors(checkout.submit().await);

    assert_eq!(
        fields,
        vec![Field::Cart, Field::FullName, Field::Email, Field::Phone]
    );
    assert!(h.notifier.has_error());
}

// ============================================================================
// Cash
// ============================================================================

#[tokio::test]
async fn test_cash_delivery_order_end_to_end() {
    let h = Harness::new();
    h.fill_reference_cart();
    assert_eq!(h.state.cart().cart_total(), decimal("17.00"));

    let mut checkout = delivery_checkout(&h, PaymentMethod::Cash);
    assert_eq!(checkout.draft().city(), "Vincennes");
    assert!(checkout.draft().is_city_locked());

    let outcome = checkout.submit().await.unwrap();

    let SubmitOutcome::Completed(completed) = outcome else {
        panic!("cash checkout should complete immediately");
    };
    let created = h.backend.created_orders();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].status, OrderStatus::Pending);
    assert_eq!(created[0].payment_reference, None);
    assert_eq!(created[0].draft.subtotal, decimal("17.00"));
    assert_eq!(created[0].draft.delivery_fee, decimal("5.00"));
    assert_eq!(created[0].draft.total, decimal("22.00"));
    assert_eq!(
        created[0].draft.fulfillment,
        FulfillmentDetails::Delivery {
            street: "1 rue de Fontenay".to_string(),
            postal_code: "94300".to_string(),
            city: "Vincennes".to_string(),
            time_slot: Some(TimeSlot::Morning),
        }
    );

    assert_eq!(completed.order.draft.total, decimal("22.00"));
    assert_eq!(completed.redirect.location, ORDER_HISTORY_PATH);
    assert!(h.state.cart().is_empty());
    assert!(matches!(checkout.state(), CheckoutState::Completed(_)));
    assert!(!h.notifier.has_error());
}

#[tokio::test]
async fn test_cash_pickup_has_no_delivery_fee() {
    let h = Harness::new();
    h.fill_reference_cart();
    let mut checkout = h.state.checkout();
    fill_contact(&mut checkout);
    checkout
        .draft_mut()
        .unwrap()
        .set_pickup_location(Some(PickupLocation::SaintMande));

    checkout.submit().await.unwrap();

    let created = h.backend.created_orders();
    assert_eq!(created[0].draft.delivery_fee, decimal("0"));
    assert_eq!(created[0].draft.total, decimal("17.00"));
    assert_eq!(
        created[0].draft.items[1].line_total,
        decimal("10.00")
    );
}

#[tokio::test]
async fn test_failed_cash_order_returns_to_editing() {
    let h = Harness::new();
    h.fill_reference_cart();
    h.backend.fail_next_order_creations(1);
    let mut checkout = delivery_checkout(&h, PaymentMethod::Cash);

    let err = checkout.submit().await.unwrap_err();

    assert!(matches!(err, CheckoutError::Api(_)));
    assert_eq!(err.user_message(), "Order service unavailable");
    assert_eq!(checkout.state(), &CheckoutState::Editing);
    assert!(h.notifier.has_error());
    assert_eq!(h.state.cart().item_count(), 3);

    // The shopper can simply try again
    checkout.submit().await.unwrap();
    assert_eq!(h.backend.created_orders().len(), 2);
    assert!(h.state.cart().is_empty());
}

#[tokio::test]
async fn test_draft_is_frozen_after_completion() {
    let h = Harness::new();
    h.fill_reference_cart();
    let mut checkout = delivery_checkout(&h, PaymentMethod::Cash);
    checkout.submit().await.unwrap();

    assert!(matches!(
        checkout.draft_mut(),
        Err(CheckoutError::InvalidState { .. })
    ));
    assert!(matches!(
        checkout.submit().await,
        Err(CheckoutError::InvalidState { .. })
    ));
    assert_eq!(h.backend.created_orders().len(), 1);
}

// ============================================================================
// Card
// ============================================================================

#[tokio::test]
async fn test_card_intent_precedes_the_paid_order() {
    let h = Harness::new();
    h.fill_reference_cart();
    let mut checkout = delivery_checkout(&h, PaymentMethod::Card);

    let outcome = checkout.submit().await.unwrap();

    assert_eq!(outcome, SubmitOutcome::AwaitingPayment(PaymentMethod::Card));
    assert!(h.backend.created_orders().is_empty());
    let pending = checkout.pending_payment().unwrap();
    assert!(matches!(pending.handoff, PaymentHandoff::Card { .. }));
    assert_eq!(pending.draft_order.total, decimal("22.00"));

    let widget = FakeCardWidget::approving("pi_1");
    let completed = checkout.confirm_card_payment(&widget).await.unwrap();

    assert_eq!(widget.seen_secrets(), vec!["pi_1_secret_abc".to_string()]);
    let intent_at = h
        .backend
        .position(|c| matches!(c, Call::CreateCardIntent(_)))
        .unwrap();
    let order_at = h
        .backend
        .position(|c| matches!(c, Call::CreateOrder(_)))
        .unwrap();
    assert!(intent_at < order_at);

    let created = h.backend.created_orders();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].status, OrderStatus::Paid);
    assert_eq!(created[0].payment_reference.as_deref(), Some("pi_1"));
    assert_eq!(completed.order.status, OrderStatus::Paid);
    assert!(h.state.cart().is_empty());
}

#[tokio::test]
async fn test_declined_card_keeps_awaiting_payment() {
    let h = Harness::new();
    h.fill_reference_cart();
    let mut checkout = delivery_checkout(&h, PaymentMethod::Card);
    checkout.submit().await.unwrap();

    let err = checkout
        .confirm_card_payment(&FakeCardWidget::declining("Your card was declined"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Payment(_)));
    let pending = checkout.pending_payment().unwrap();
    assert_eq!(
        pending.inline_error.as_deref(),
        Some("Your card was declined")
    );
    assert!(h.backend.created_orders().is_empty());
    assert_eq!(h.state.cart().item_count(), 3);

    // A second card goes through
    checkout
        .confirm_card_payment(&FakeCardWidget::approving("pi_2"))
        .await
        .unwrap();
    assert_eq!(h.backend.created_orders().len(), 1);
}

#[tokio::test]
async fn test_paid_order_can_be_retried_without_charging_again() {
    let h = Harness::new();
    h.fill_reference_cart();
    h.backend.fail_next_order_creations(1);
    let mut checkout = delivery_checkout(&h, PaymentMethod::Card);
    checkout.submit().await.unwrap();

    let err = checkout
        .confirm_card_payment(&FakeCardWidget::approving("pi_1"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Api(_)));
    let pending = checkout.pending_payment().unwrap();
    assert_eq!(pending.confirmed_reference.as_deref(), Some("pi_1"));
    assert!(pending.inline_error.is_some());
    assert_eq!(h.state.cart().item_count(), 3);

    let completed = checkout.retry_paid_order().await.unwrap();

    assert_eq!(completed.order.payment_reference.as_deref(), Some("pi_1"));
    let intents = h
        .backend
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::CreateCardIntent(_)))
        .count();
    assert_eq!(intents, 1);
    assert_eq!(h.backend.created_orders().len(), 2);
    assert!(h.state.cart().is_empty());
}

#[tokio::test]
async fn test_confirmed_card_payment_is_never_charged_twice() {
    let h = Harness::new();
    h.fill_reference_cart();
    h.backend.fail_next_order_creations(1);
    let mut checkout = delivery_checkout(&h, PaymentMethod::Card);
    checkout.submit().await.unwrap();
    checkout
        .confirm_card_payment(&FakeCardWidget::approving("pi_1"))
        .await
        .unwrap_err();

    let second = FakeCardWidget::approving("pi_2");
    let err = checkout.confirm_card_payment(&second).await.unwrap_err();

    assert!(matches!(err, CheckoutError::InvalidState { .. }));
    assert!(second.seen_secrets().is_empty());
    let err = checkout
        .on_payment_confirmed(PaymentConfirmation::new("pi_3"))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidState { .. }));
    assert_eq!(h.backend.created_orders().len(), 1);

    let completed = checkout.retry_paid_order().await.unwrap();
    assert_eq!(completed.order.payment_reference.as_deref(), Some("pi_1"));
}

#[tokio::test]
async fn test_cancelled_card_payment_returns_to_editing() {
    let h = Harness::new();
    h.fill_reference_cart();
    let mut checkout = delivery_checkout(&h, PaymentMethod::Card);
    checkout.submit().await.unwrap();

    checkout.cancel_payment().unwrap();

    assert_eq!(checkout.state(), &CheckoutState::Editing);
    assert!(checkout.retry_paid_order().await.is_err());
    assert!(h.backend.created_orders().is_empty());

    // Switching to cash from the same form works
    checkout
        .draft_mut()
        .unwrap()
        .set_payment_method(PaymentMethod::Cash);
    checkout.submit().await.unwrap();
    assert_eq!(h.backend.created_orders()[0].status, OrderStatus::Pending);
}

// ============================================================================
// PayPal
// ============================================================================

#[tokio::test]
async fn test_paypal_approval_captures_then_creates_paid_order() {
    let h = Harness::new();
    h.fill_reference_cart();
    let mut checkout = delivery_checkout(&h, PaymentMethod::PayPal);

    let outcome = checkout.submit().await.unwrap();
    assert_eq!(outcome, SubmitOutcome::AwaitingPayment(PaymentMethod::PayPal));
    assert!(h.backend.calls().is_empty());

    let completed = checkout
        .pay_with_paypal(&FakePayPalWidget::approving())
        .await
        .unwrap();

    let calls = h.backend.calls();
    assert!(matches!(calls[0], Call::CreatePayPalOrder(_)));
    assert_eq!(calls[1], Call::CapturePayPalOrder("PAYPAL-1".to_string()));
    assert!(matches!(calls[2], Call::CreateOrder(_)));
    assert_eq!(
        completed.order.payment_reference.as_deref(),
        Some("CAPTURE-PAYPAL-1")
    );
    assert_eq!(completed.order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_incomplete_paypal_capture_creates_no_order() {
    let h = Harness::new();
    h.fill_reference_cart();
    h.backend.set_capture_status("PENDING");
    let mut checkout = delivery_checkout(&h, PaymentMethod::PayPal);
    checkout.submit().await.unwrap();

    let err = checkout
        .pay_with_paypal(&FakePayPalWidget::approving())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Payment(_)));
    assert!(checkout.pending_payment().unwrap().inline_error.is_some());
    assert!(h.backend.created_orders().is_empty());
}

#[tokio::test]
async fn test_closed_paypal_window_keeps_awaiting_payment() {
    let h = Harness::new();
    h.fill_reference_cart();
    let mut checkout = delivery_checkout(&h, PaymentMethod::PayPal);
    checkout.submit().await.unwrap();

    let err = checkout
        .pay_with_paypal(&FakePayPalWidget::cancelling())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Payment(_)));
    assert!(
        h.backend
            .position(|c| matches!(c, Call::CapturePayPalOrder(_)))
            .is_none()
    );
    let pending = checkout.pending_payment().unwrap();
    assert_eq!(
        pending.handoff,
        PaymentHandoff::PayPal {
            provider_order_id: Some("PAYPAL-1".to_string())
        }
    );
}

#[tokio::test]
async fn test_captured_paypal_payment_is_never_captured_twice() {
    let h = Harness::new();
    h.fill_reference_cart();
    h.backend.fail_next_order_creations(1);
    let mut checkout = delivery_checkout(&h, PaymentMethod::PayPal);
    checkout.submit().await.unwrap();
    checkout
        .pay_with_paypal(&FakePayPalWidget::approving())
        .await
        .unwrap_err();

    let err = checkout
        .pay_with_paypal(&FakePayPalWidget::approving())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidState { .. }));
    let err = checkout.on_paypal_approved("PAYPAL-1").await.unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidState { .. }));

    let paypal_calls = h
        .backend
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::CreatePayPalOrder(_) | Call::CapturePayPalOrder(_)))
        .count();
    assert_eq!(paypal_calls, 2);

    let completed = checkout.retry_paid_order().await.unwrap();
    assert_eq!(
        completed.order.payment_reference.as_deref(),
        Some("CAPTURE-PAYPAL-1")
    );
}

#[tokio::test]
async fn test_paypal_approval_for_another_order_is_refused() {
    let h = Harness::new();
    h.fill_reference_cart();
    let mut checkout = delivery_checkout(&h, PaymentMethod::PayPal);
    checkout.submit().await.unwrap();

    // No provider order created yet
    let err = checkout.on_paypal_approved("PAYPAL-1").await.unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidState { .. }));

    checkout.create_paypal_order().await.unwrap();
    let err = checkout.on_paypal_approved("PAYPAL-STALE").await.unwrap_err();

    assert!(matches!(err, CheckoutError::InvalidState { .. }));
    assert!(
        h.backend
            .position(|c| matches!(c, Call::CapturePayPalOrder(_)))
            .is_none()
    );
    assert!(h.backend.created_orders().is_empty());

    let completed = checkout.on_paypal_approved("PAYPAL-1").await.unwrap();
    assert_eq!(completed.order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_card_widget_refused_while_paypal_is_pending() {
    let h = Harness::new();
    h.fill_reference_cart();
    let mut checkout = delivery_checkout(&h, PaymentMethod::PayPal);
    checkout.submit().await.unwrap();

    let err = checkout
        .confirm_card_payment(&FakeCardWidget::approving("pi_1"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::InvalidState { .. }));
    assert!(h.backend.created_orders().is_empty());
}
