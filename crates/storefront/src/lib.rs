//! Verger storefront library.
//!
//! The stateful core of the Verger storefront client: a persisted cart and
//! favorites, the checkout state machine, the delivery zone directory, the
//! session guard and the typed backend client. Front ends (the `verger` CLI,
//! tests) drive it through [`state::AppState`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod models;
pub mod navigation;
pub mod notify;
pub mod state;
pub mod storage;
pub mod store;
pub mod zones;
