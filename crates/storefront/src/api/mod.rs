//! Typed client for the storefront backend.
//!
//! # Architecture
//!
//! - REST + JSON over `reqwest`, bearer token attached when one is stored
//! - The backend is the source of truth for catalog, identity and orders
//! - Catalog reads are cached in memory via `moka` (5 minute TTL)
//! - Each concern sits behind its own trait so checkout and session logic can
//!   run against in-memory fakes
//!
//! # Endpoints
//!
//! | Trait | Endpoints |
//! |---|---|
//! | [`IdentityApi`] | `POST /auth/login`, `POST /auth/register`, `GET /auth/me`, `PUT /profile`, `POST /auth/forgot` |
//! | [`CatalogApi`] | `GET /products`, `GET /products/{id}` |
//! | [`OrderApi`] | `POST /orders`, `GET /orders/my`, `GET /orders/{id}` |
//! | [`PaymentApi`] | `POST /payments/stripe/create-intent`, `POST /payments/paypal/create-order`, `POST /payments/paypal/capture` |

mod cache;
mod client;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use verger_core::{OrderId, ProductId};

use crate::models::UserProfile;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the `{ "message": ... }` error body.
        message: String,
    },

    /// Missing, expired or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the backend rejected the credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Message safe to show to the shopper.
    ///
    /// Backend messages are surfaced verbatim; transport and parse failures
    /// are not.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::Unauthorized(message) | Self::NotFound(message)
                if !message.is_empty() =>
            {
                message.clone()
            }
            Self::Unauthorized(_) => "Please sign in again".to_string(),
            Self::NotFound(_) => "Not found".to_string(),
            Self::RateLimited(_) => "Too many requests, please try again shortly".to_string(),
            Self::Http(_) | Self::Api { .. } => {
                "The store is unreachable, please try again".to_string()
            }
            Self::Parse(_) | Self::InvalidUrl(_) => {
                "Unexpected response from the store".to_string()
            }
        }
    }
}

/// Identity endpoints.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Exchange credentials for a token and profile.
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;

    /// Create an account and sign in.
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError>;

    /// Profile for the stored bearer token.
    async fn me(&self) -> Result<UserProfile, ApiError>;

    /// Update the signed-in profile.
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError>;

    /// Ask the backend to send a password reset email.
    async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<(), ApiError>;
}

/// Catalog endpoints.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// One page of products.
    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError>;

    /// A single product.
    async fn product(&self, id: &ProductId) -> Result<Product, ApiError>;
}

/// Order endpoints.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Persist a new order.
    async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError>;

    /// Orders of the signed-in user, newest first.
    async fn my_orders(&self) -> Result<Vec<Order>, ApiError>;

    /// A single order.
    async fn order(&self, id: &OrderId) -> Result<Order, ApiError>;
}

/// Payment provider endpoints (proxied by the backend).
#[async_trait]
pub trait PaymentApi: Send + Sync {
    /// Create a card payment intent for a draft order.
    async fn create_card_intent(&self, draft: &DraftOrder) -> Result<PaymentIntent, ApiError>;

    /// Create a PayPal order for a draft order.
    async fn create_paypal_order(&self, draft: &DraftOrder) -> Result<PayPalOrder, ApiError>;

    /// Capture an approved PayPal order.
    async fn capture_paypal_order(&self, provider_order_id: &str)
    -> Result<PayPalCapture, ApiError>;
}
