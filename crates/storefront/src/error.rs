//! Unified error handling with Sentry integration.
//!
//! Each module has its own error enum; [`AppError`] collects them for front
//! ends that want a single type. [`AppError::report`] captures remote and
//! internal failures to Sentry before the front end shows
//! [`AppError::user_message`].

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Durable storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),
}

impl AppError {
    /// Whether this error is worth an event in Sentry.
    ///
    /// Validation, credential and not-found errors are expected outcomes.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        match self {
            Self::Config(_) | Self::Storage(_) | Self::Auth(AuthError::Storage(_)) => true,
            Self::Api(err)
            | Self::Auth(AuthError::Api(err))
            | Self::Checkout(CheckoutError::Api(err)) => {
                !matches!(err, ApiError::Unauthorized(_) | ApiError::NotFound(_))
            }
            Self::Auth(_) | Self::Checkout(_) => false,
        }
    }

    /// Log the error and, when reportable, capture it to Sentry.
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "Storefront error");
        }
    }

    /// Message safe to show to the shopper.
    ///
    /// Internal details (paths, status codes, parse errors) are never
    /// included.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) => "The storefront is misconfigured".to_string(),
            Self::Storage(_) => "Could not save your data on this device".to_string(),
            Self::Api(err) => err.user_message(),
            Self::Auth(err) => err.user_message(),
            Self::Checkout(err) => err.user_message(),
        }
    }
}

/// Capture an error to Sentry and return the event ID.
pub fn capture_error<E: std::error::Error + ?Sized>(err: &E) -> uuid::Uuid {
    sentry::capture_error(err)
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "p-1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
