//! HTTP implementation of the backend traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use verger_core::{OrderId, ProductId};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AuthResponse, CaptureRequest, DraftOrder, ForgotPasswordRequest, LoginRequest, NewOrder,
    Order, Page, PayPalCapture, PayPalOrder, PaymentIntent, Product, ProductQuery, ProfileUpdate,
    RegisterRequest,
};
use super::{ApiError, CatalogApi, IdentityApi, OrderApi, PaymentApi};
use crate::auth::CredentialStore;
use crate::models::UserProfile;

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(300);
const LOGGED_BODY_CHARS: usize = 500;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront backend.
///
/// Attaches the stored bearer token to every request and caches catalog
/// reads for 5 minutes. Cloning is cheap.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    credentials: CredentialStore,
    cache: Cache<CacheKey, CacheValue>,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl ApiClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &Url,
        timeout: Duration,
        credentials: CredentialStore,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("verger/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        // Url::join drops the last path segment unless it ends with a slash
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                credentials,
                cache,
            }),
        })
    }

    /// The backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header("Accept", "application/json")
            .header("X-Request-Id", request_id);

        if let Some(token) = self.inner.credentials.token() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder
    }

    /// Send a request and decode the JSON response.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let text = self.send_raw(builder).await?;

        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %text.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                    "Failed to parse backend response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    /// Send a request and return the raw body of a successful response.
    async fn send_raw(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized(message)),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(message)),
            _ => {
                tracing::error!(
                    status = %status,
                    body = %text.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                    "Backend returned non-success status"
                );
                Err(ApiError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        self.send(self.request(Method::GET, url)).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        self.send(self.request(Method::POST, url).json(body)).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("credentials", &self.inner.credentials)
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Identity
// =============================================================================

#[async_trait]
impl IdentityApi for ApiClient {
    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post("auth/login", request).await
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.post("auth/register", request).await
    }

    #[instrument(skip(self))]
    async fn me(&self) -> Result<UserProfile, ApiError> {
        if !self.inner.credentials.has_token() {
            return Err(ApiError::Unauthorized(String::new()));
        }
        self.get(self.endpoint("auth/me")?).await
    }

    #[instrument(skip(self))]
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let url = self.endpoint("profile")?;
        self.send(self.request(Method::PUT, url).json(update)).await
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<(), ApiError> {
        let url = self.endpoint("auth/forgot")?;
        self.send_raw(self.request(Method::POST, url).json(request))
            .await?;
        Ok(())
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[async_trait]
impl CatalogApi for ApiClient {
    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        let cache_key = CacheKey::Products(query.clone());
        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let mut url = self.endpoint("products")?;
        let pairs = query.to_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let page: Page<Product> = self.get(url).await?;
        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;
        Ok(page)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("products/{}", urlencoding::encode(id.as_str()));
        let product: Product = self.get(self.endpoint(&path)?).await?;
        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderApi for ApiClient {
    #[instrument(
        skip(self, order),
        fields(
            status = %order.status,
            payment_method = %order.draft.payment_method,
            total = %order.draft.total,
        )
    )]
    async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        self.post("orders", order).await
    }

    #[instrument(skip(self))]
    async fn my_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.get(self.endpoint("orders/my")?).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn order(&self, id: &OrderId) -> Result<Order, ApiError> {
        let path = format!("orders/{}", urlencoding::encode(id.as_str()));
        self.get(self.endpoint(&path)?).await
    }
}

// =============================================================================
// Payments
// =============================================================================

#[async_trait]
impl PaymentApi for ApiClient {
    #[instrument(skip(self, draft), fields(total = %draft.total))]
    async fn create_card_intent(&self, draft: &DraftOrder) -> Result<PaymentIntent, ApiError> {
        self.post("payments/stripe/create-intent", draft).await
    }

    #[instrument(skip(self, draft), fields(total = %draft.total))]
    async fn create_paypal_order(&self, draft: &DraftOrder) -> Result<PayPalOrder, ApiError> {
        self.post("payments/paypal/create-order", draft).await
    }

    #[instrument(skip(self))]
    async fn capture_paypal_order(
        &self,
        provider_order_id: &str,
    ) -> Result<PayPalCapture, ApiError> {
        let body = CaptureRequest {
            order_id: provider_order_id.to_owned(),
        };
        self.post("payments/paypal/capture", &body).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn client(base: &str) -> ApiClient {
        let credentials = CredentialStore::new(Arc::new(MemoryStorage::new()));
        ApiClient::new(
            &Url::parse(base).unwrap(),
            Duration::from_secs(5),
            credentials,
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("https://api.example.fr/v1");
        assert_eq!(client.base_url().as_str(), "https://api.example.fr/v1/");
        assert_eq!(
            client.endpoint("/auth/me").unwrap().as_str(),
            "https://api.example.fr/v1/auth/me"
        );
    }

    #[test]
    fn test_endpoint_at_root() {
        let client = client("http://localhost:4000/");
        assert_eq!(
            client.endpoint("payments/paypal/capture").unwrap().as_str(),
            "http://localhost:4000/payments/paypal/capture"
        );
    }

    #[tokio::test]
    async fn test_me_without_token_is_unauthorized() {
        // No request is sent; the host does not need to exist.
        let client = client("http://verger.invalid/");
        let err = client.me().await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_debug_omits_token() {
        let client = client("http://localhost:4000/");
        let debug = format!("{client:?}");
        assert!(debug.contains("localhost:4000"));
    }
}
