//! Integration tests for the session guard.
//!
//! The fake backend validates the bearer token from the same storage the
//! client writes it to, so these tests cover the full token lifecycle.

#![allow(clippy::unwrap_used)]

use verger_core::PaymentMethod;
use verger_integration_tests::{Call, Harness, PASSWORD, profile};
use verger_storefront::api::ProfileUpdate;
use verger_storefront::auth::{Access, AuthError, SessionState};
use verger_storefront::models::storage_keys;
use verger_storefront::navigation::Redirect;
use verger_storefront::storage::Storage;

#[tokio::test]
async fn test_session_starts_indeterminate() {
    let h = Harness::new().with_valid_token();

    assert_eq!(h.state.session().state(), SessionState::Indeterminate);
    assert_eq!(h.state.session().authorize("/orders"), Access::Pending);
    assert_eq!(h.state.session().authorize("/products/melon"), Access::Allow);
}

#[tokio::test]
async fn test_valid_token_authenticates() {
    let h = Harness::new().with_valid_token();

    let state = h.state.session().reconcile().await;

    assert_eq!(state, SessionState::Authenticated(profile()));
    assert_eq!(h.state.session().authorize("/orders"), Access::Allow);
    assert_eq!(h.backend.calls(), vec![Call::Me]);
}

#[tokio::test]
async fn test_rejected_token_is_removed() {
    let h = Harness::new();
    h.storage.set(storage_keys::AUTH_TOKEN, "tok-expired").unwrap();

    let state = h.state.session().reconcile().await;

    assert_eq!(state, SessionState::Unauthenticated);
    assert_eq!(h.storage.get(storage_keys::AUTH_TOKEN).unwrap(), None);
    assert_eq!(
        h.state.session().authorize("/account"),
        Access::RedirectToLogin(Redirect::to_login("/account"))
    );
}

#[tokio::test]
async fn test_start_drops_a_stale_token_before_other_calls() {
    let h = Harness::new();
    h.storage.set(storage_keys::AUTH_TOKEN, "tok-expired").unwrap();

    let state = h.state.start().await;

    assert_eq!(state, SessionState::Unauthenticated);
    assert_eq!(h.storage.get(storage_keys::AUTH_TOKEN).unwrap(), None);
    assert_eq!(h.backend.calls(), vec![Call::Me]);
    assert_eq!(
        h.state.session().authorize("/orders"),
        Access::RedirectToLogin(Redirect::to_login("/orders"))
    );
}

#[tokio::test]
async fn test_no_token_skips_the_identity_call() {
    let h = Harness::new();

    let state = h.state.session().reconcile().await;

    assert_eq!(state, SessionState::Unauthenticated);
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn test_protected_navigation_redirects_with_return_path() {
    let h = Harness::new();

    let access = h.state.session().on_navigation("/orders/ord-1").await;

    let Access::RedirectToLogin(redirect) = access else {
        panic!("expected a login redirect, got {access:?}");
    };
    assert_eq!(redirect.location, "/login?redirect=%2Forders%2Ford-1");
}

#[tokio::test]
async fn test_login_then_checkout_is_prefilled() {
    let h = Harness::new();
    h.state.session().reconcile().await;

    let user = h
        .state
        .session()
        .login("marie@example.fr", PASSWORD)
        .await
        .unwrap();

    assert_eq!(user, profile());
    assert!(h.storage.get(storage_keys::AUTH_TOKEN).unwrap().is_some());
    assert_eq!(h.state.session().on_navigation("/checkout").await, Access::Allow);

    let checkout = h.state.checkout();
    assert_eq!(checkout.draft().full_name, "Marie Curie");
    assert_eq!(checkout.draft().email, "marie@example.fr");
    assert_eq!(checkout.draft().phone, "0601020304");
    assert_eq!(checkout.draft().payment_method(), PaymentMethod::Cash);
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() {
    let h = Harness::new();

    let err = h
        .state
        .session()
        .login("marie@example.fr", "wrong password")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(h.storage.get(storage_keys::AUTH_TOKEN).unwrap().is_none());
}

#[tokio::test]
async fn test_register_signs_in() {
    let h = Harness::new();

    let user = h
        .state
        .session()
        .register("Pierre Curie", "pierre@example.fr", Some("0605060708"), PASSWORD)
        .await
        .unwrap();

    assert_eq!(user.name, "Pierre Curie");
    assert!(h.state.session().state().is_authenticated());
    assert_eq!(h.backend.calls(), vec![Call::Register]);
}

#[tokio::test]
async fn test_register_validates_before_calling_the_backend() {
    let h = Harness::new();

    let err = h
        .state
        .session()
        .register("Pierre", "pierre@example.fr", None, "short")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::WeakPassword(_)));
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn test_logout_keeps_the_cart() {
    let h = Harness::new().with_valid_token();
    h.state.session().reconcile().await;
    h.fill_reference_cart();

    h.state.session().logout();

    assert_eq!(h.state.session().state(), SessionState::Unauthenticated);
    assert!(h.storage.get(storage_keys::AUTH_TOKEN).unwrap().is_none());
    assert_eq!(h.state.cart().item_count(), 3);
}

#[tokio::test]
async fn test_profile_update_after_token_revocation_signs_out() {
    let h = Harness::new().with_valid_token();
    h.state.session().reconcile().await;

    let updated = h
        .state
        .session()
        .update_profile(&ProfileUpdate {
            name: None,
            phone: Some("0611111111".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(updated.phone.as_deref(), Some("0611111111"));
    assert_eq!(h.state.session().user().unwrap().phone, updated.phone);

    // The backend forgets the token
    h.storage.set(storage_keys::AUTH_TOKEN, "tok-revoked").unwrap();
    let err = h
        .state
        .session()
        .update_profile(&ProfileUpdate::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::NotAuthenticated));
    assert_eq!(h.state.session().state(), SessionState::Unauthenticated);
}
