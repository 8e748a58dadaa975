//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VERGER_API_URL` - Base URL of the storefront backend
//!
//! ## Optional
//! - `VERGER_STATE_DIR` - Directory for the persisted cart and token (default: .verger)
//! - `VERGER_CURRENCY` - ISO 4217 currency of prices (default: EUR)
//! - `VERGER_DELIVERY_FEE` - Flat home delivery fee (default: 5.00)
//! - `VERGER_REDIRECT_DELAY_MS` - Delay before leaving a completed checkout (default: 1500)
//! - `VERGER_HTTP_TIMEOUT_SECS` - Backend request timeout (default: 30)
//! - `STRIPE_PUBLISHABLE_KEY` - Card widget key; must be a publishable `pk_` key
//! - `PAYPAL_CLIENT_ID` - PayPal buttons client ID
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

use verger_core::CurrencyCode;

const DEFAULT_STATE_DIR: &str = ".verger";
const DEFAULT_DELIVERY_FEE: &str = "5.00";
const DEFAULT_REDIRECT_DELAY_MS: &str = "1500";
const DEFAULT_HTTP_TIMEOUT_SECS: &str = "30";

/// Key prefixes that must never ship to a client.
const SECRET_KEY_PREFIXES: &[&str] = &["sk_", "rk_"];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure key in {0}: {1}")]
    InsecureKey(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend base URL
    pub api_url: Url,
    /// Directory holding persisted state
    pub state_dir: PathBuf,
    /// Backend request timeout
    pub http_timeout: Duration,
    /// Checkout pricing and navigation settings
    pub checkout: CheckoutSettings,
    /// Payment widget configuration
    pub payments: PaymentConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Checkout pricing and navigation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// Flat fee added to delivery orders
    pub delivery_fee: Decimal,
    /// Currency of every amount
    pub currency: CurrencyCode,
    /// Delay before redirecting to order history after a completed checkout
    pub redirect_delay: Duration,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            delivery_fee: Decimal::new(500, 2),
            currency: CurrencyCode::EUR,
            redirect_delay: Duration::from_millis(1500),
        }
    }
}

/// Client-side payment widget configuration.
///
/// Both values are public identifiers; secret keys are rejected at load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentConfig {
    /// Stripe publishable key (`pk_...`)
    pub stripe_publishable_key: Option<String>,
    /// PayPal client ID
    pub paypal_client_id: Option<String>,
}

impl PaymentConfig {
    /// Whether card payments can be offered.
    #[must_use]
    pub const fn card_enabled(&self) -> bool {
        self.stripe_publishable_key.is_some()
    }

    /// Whether PayPal can be offered.
    #[must_use]
    pub const fn paypal_enabled(&self) -> bool {
        self.paypal_client_id.is_some()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if a secret payment key is configured where a public one belongs.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let api_url = env.required("VERGER_API_URL")?;
        let api_url = Url::parse(&api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("VERGER_API_URL".to_string(), e.to_string()))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "VERGER_API_URL".to_string(),
                format!("unsupported scheme '{}'", api_url.scheme()),
            ));
        }

        let state_dir = PathBuf::from(env.or_default("VERGER_STATE_DIR", DEFAULT_STATE_DIR));
        let http_timeout = Duration::from_secs(
            env.parsed("VERGER_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
        );

        let checkout = CheckoutSettings::from_env(&env)?;
        let payments = PaymentConfig::from_env(&env)?;

        Ok(Self {
            api_url,
            state_dir,
            http_timeout,
            checkout,
            payments,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

impl CheckoutSettings {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let delivery_fee: Decimal = env.parsed("VERGER_DELIVERY_FEE", DEFAULT_DELIVERY_FEE)?;
        if delivery_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "VERGER_DELIVERY_FEE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            delivery_fee,
            currency: env.parsed("VERGER_CURRENCY", "EUR")?,
            redirect_delay: Duration::from_millis(
                env.parsed("VERGER_REDIRECT_DELAY_MS", DEFAULT_REDIRECT_DELAY_MS)?,
            ),
        })
    }
}

impl PaymentConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let stripe_publishable_key = env.optional("STRIPE_PUBLISHABLE_KEY");
        if let Some(key) = &stripe_publishable_key {
            validate_publishable_key(key, "STRIPE_PUBLISHABLE_KEY")?;
        }

        Ok(Self {
            stripe_publishable_key,
            paypal_client_id: env.optional("PAYPAL_CLIENT_ID"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get a required environment variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional environment variable. Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Get an environment variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse an environment variable, falling back to a default value.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Validate that a payment key is a publishable key and not a secret one.
fn validate_publishable_key(key: &str, var_name: &str) -> Result<(), ConfigError> {
    if let Some(prefix) = SECRET_KEY_PREFIXES.iter().find(|p| key.starts_with(**p)) {
        return Err(ConfigError::InsecureKey(
            var_name.to_string(),
            format!("'{prefix}' keys are secret and must never ship to a client"),
        ));
    }
    if !key.starts_with("pk_") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "expected a publishable key starting with 'pk_'".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("VERGER_API_URL", "https://api.verger.example/v1")]).unwrap();
        assert_eq!(config.api_url.as_str(), "https://api.verger.example/v1");
        assert_eq!(config.state_dir, PathBuf::from(".verger"));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.checkout, CheckoutSettings::default());
        assert!(!config.payments.card_enabled());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_api_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "VERGER_API_URL"));
    }

    #[test]
    fn test_invalid_api_url() {
        assert!(matches!(
            load(&[("VERGER_API_URL", "not a url")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[("VERGER_API_URL", "ftp://files.example")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_checkout_overrides() {
        let config = load(&[
            ("VERGER_API_URL", "http://localhost:4000"),
            ("VERGER_DELIVERY_FEE", "3.90"),
            ("VERGER_CURRENCY", "chf"),
            ("VERGER_REDIRECT_DELAY_MS", "0"),
        ])
        .unwrap();
        assert_eq!(config.checkout.delivery_fee, Decimal::new(390, 2));
        assert_eq!(config.checkout.currency, CurrencyCode::CHF);
        assert_eq!(config.checkout.redirect_delay, Duration::ZERO);
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(matches!(
            load(&[
                ("VERGER_API_URL", "http://localhost:4000"),
                ("VERGER_DELIVERY_FEE", "-1")
            ]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[
                ("VERGER_API_URL", "http://localhost:4000"),
                ("VERGER_HTTP_TIMEOUT_SECS", "soon")
            ]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_secret_stripe_key_rejected() {
        let err = load(&[
            ("VERGER_API_URL", "http://localhost:4000"),
            ("STRIPE_PUBLISHABLE_KEY", "sk_live_abc123"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureKey(_, _)));
    }

    #[test]
    fn test_publishable_stripe_key_accepted() {
        let config = load(&[
            ("VERGER_API_URL", "http://localhost:4000"),
            ("STRIPE_PUBLISHABLE_KEY", "pk_test_abc123"),
            ("PAYPAL_CLIENT_ID", "  "),
        ])
        .unwrap();
        assert!(config.payments.card_enabled());
        assert!(!config.payments.paypal_enabled());
    }

    #[test]
    fn test_validate_publishable_key_prefix() {
        assert!(matches!(
            validate_publishable_key("abc", "TEST_VAR"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(validate_publishable_key("pk_live_x", "TEST_VAR").is_ok());
    }
}
