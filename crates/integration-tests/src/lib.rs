//! Integration tests for the Verger storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p verger-integration-tests
//! ```
//!
//! The tests drive [`AppState`] end to end against an in-memory
//! [`FakeBackend`] that stands in for the storefront API and the payment
//! providers. Every backend call is recorded so tests can assert on what
//! was sent and in which order.
//!
//! # Test Categories
//!
//! - `cart_store` - Cart and favorites persistence
//! - `checkout_flow` - Validation, cash, card and `PayPal` checkouts
//! - `session_reconciliation` - Token validation and protected views

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use verger_core::{Email, OrderId, ProductId, UserId, VariantId};
use verger_storefront::api::{
    ApiError, AuthResponse, CatalogApi, DraftOrder, ForgotPasswordRequest, IdentityApi,
    LoginRequest, NewOrder, Order, OrderApi, Page, PayPalCapture, PayPalOrder, PaymentApi,
    PaymentIntent, Product, ProductQuery, ProfileUpdate, RegisterRequest, Unit, Variant,
};
use verger_storefront::checkout::{
    CardPaymentWidget, PayPalWidget, PaymentConfirmation, PaymentFailure,
};
use verger_storefront::config::StorefrontConfig;
use verger_storefront::models::{UserProfile, storage_keys};
use verger_storefront::notify::{Notification, NotificationLevel, Notifier};
use verger_storefront::state::{AppState, Backends};
use verger_storefront::storage::{MemoryStorage, Storage};

/// Password accepted by [`FakeBackend`] for every account.
pub const PASSWORD: &str = "correct horse";

// =============================================================================
// Recorded calls
// =============================================================================

/// One call received by the fake backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login,
    Register,
    Me,
    UpdateProfile,
    ForgotPassword,
    ListProducts,
    Product(ProductId),
    CreateOrder(NewOrder),
    MyOrders,
    Order(OrderId),
    CreateCardIntent(DraftOrder),
    CreatePayPalOrder(DraftOrder),
    CapturePayPalOrder(String),
}

// =============================================================================
// FakeBackend
// =============================================================================

/// In-memory storefront API and payment provider.
///
/// Tokens are checked against the same storage the client writes them to,
/// the way the real backend checks the bearer header.
pub struct FakeBackend {
    storage: Arc<dyn Storage>,
    user: UserProfile,
    products: Vec<Product>,
    valid_tokens: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    orders: Mutex<Vec<Order>>,
    failing_order_creations: Mutex<u32>,
    capture_status: Mutex<String>,
}

impl FakeBackend {
    /// A backend knowing `products` and the account from [`profile`].
    pub fn new(storage: Arc<dyn Storage>, products: Vec<Product>) -> Self {
        Self {
            storage,
            user: profile(),
            products,
            valid_tokens: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            failing_order_creations: Mutex::new(0),
            capture_status: Mutex::new("COMPLETED".to_string()),
        }
    }

    /// Accept `token` as a valid bearer token.
    pub fn accept_token(&self, token: &str) {
        lock(&self.valid_tokens).insert(token.to_owned());
    }

    /// Fail the next `count` order creations with a server error.
    pub fn fail_next_order_creations(&self, count: u32) {
        *lock(&self.failing_order_creations) = count;
    }

    /// Status reported by the next `PayPal` captures.
    pub fn set_capture_status(&self, status: &str) {
        status.clone_into(&mut lock(&self.capture_status));
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Bodies of every order creation request, failed ones included.
    pub fn created_orders(&self) -> Vec<NewOrder> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateOrder(order) => Some(order),
                _ => None,
            })
            .collect()
    }

    /// Position of the first call matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls().iter().position(predicate)
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn issue_token(&self) -> String {
        let token = format!("tok-{}", lock(&self.valid_tokens).len() + 1);
        self.accept_token(&token);
        token
    }

    fn authenticate(&self) -> Result<(), ApiError> {
        let token = self
            .storage
            .get(storage_keys::AUTH_TOKEN)
            .ok()
            .flatten()
            .ok_or_else(|| ApiError::Unauthorized("Missing token".to_string()))?;
        if lock(&self.valid_tokens).contains(token.trim()) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized("Invalid token".to_string()))
        }
    }
}

#[async_trait]
impl IdentityApi for FakeBackend {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.record(Call::Login);
        if request.email != self.user.email || request.password != PASSWORD {
            return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
        }
        Ok(AuthResponse {
            token: self.issue_token(),
            user: self.user.clone(),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.record(Call::Register);
        if request.email == self.user.email {
            return Err(ApiError::Api {
                status: 409,
                message: "An account already exists for this email".to_string(),
            });
        }
        Ok(AuthResponse {
            token: self.issue_token(),
            user: UserProfile {
                id: UserId::new("u-new"),
                name: request.name.clone(),
                email: request.email.clone(),
                phone: request.phone.clone(),
                loyalty_points: 0,
            },
        })
    }

    async fn me(&self) -> Result<UserProfile, ApiError> {
        self.record(Call::Me);
        self.authenticate()?;
        Ok(self.user.clone())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        self.record(Call::UpdateProfile);
        self.authenticate()?;
        let mut user = self.user.clone();
        if let Some(name) = &update.name {
            user.name.clone_from(name);
        }
        if update.phone.is_some() {
            user.phone.clone_from(&update.phone);
        }
        Ok(user)
    }

    async fn forgot_password(&self, _request: &ForgotPasswordRequest) -> Result<(), ApiError> {
        self.record(Call::ForgotPassword);
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for FakeBackend {
    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        self.record(Call::ListProducts);
        let items: Vec<Product> = self
            .products
            .iter()
            .filter(|p| query.category.as_ref().is_none_or(|c| &p.category == c))
            .cloned()
            .collect();
        Ok(Page {
            total: items.len() as u64,
            items,
            page: 1,
            total_pages: 1,
        })
    }

    async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.record(Call::Product(id.clone()));
        self.products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))
    }
}

#[async_trait]
impl OrderApi for FakeBackend {
    async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        self.record(Call::CreateOrder(order.clone()));
        {
            let mut failing = lock(&self.failing_order_creations);
            if *failing > 0 {
                *failing -= 1;
                return Err(ApiError::Api {
                    status: 503,
                    message: "Order service unavailable".to_string(),
                });
            }
        }

        let mut orders = lock(&self.orders);
        let created = Order {
            id: OrderId::new(format!("ord-{}", orders.len() + 1)),
            draft: order.draft.clone(),
            status: order.status,
            payment_reference: order.payment_reference.clone(),
            created_at: Utc::now(),
        };
        orders.push(created.clone());
        Ok(created)
    }

    async fn my_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.record(Call::MyOrders);
        self.authenticate()?;
        Ok(lock(&self.orders).clone())
    }

    async fn order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.record(Call::Order(id.clone()));
        self.authenticate()?;
        lock(&self.orders)
            .iter()
            .find(|o| &o.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))
    }
}

#[async_trait]
impl PaymentApi for FakeBackend {
    async fn create_card_intent(&self, draft: &DraftOrder) -> Result<PaymentIntent, ApiError> {
        self.record(Call::CreateCardIntent(draft.clone()));
        Ok(PaymentIntent {
            client_secret: "pi_1_secret_abc".to_string(),
            intent_id: Some("pi_1".to_string()),
        })
    }

    async fn create_paypal_order(&self, draft: &DraftOrder) -> Result<PayPalOrder, ApiError> {
        self.record(Call::CreatePayPalOrder(draft.clone()));
        Ok(PayPalOrder {
            id: "PAYPAL-1".to_string(),
        })
    }

    async fn capture_paypal_order(
        &self,
        provider_order_id: &str,
    ) -> Result<PayPalCapture, ApiError> {
        self.record(Call::CapturePayPalOrder(provider_order_id.to_owned()));
        Ok(PayPalCapture {
            id: format!("CAPTURE-{provider_order_id}"),
            status: lock(&self.capture_status).clone(),
        })
    }
}

// =============================================================================
// Notifier and payment widgets
// =============================================================================

/// Keeps every notification for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    /// Whether an error notification was raised.
    pub fn has_error(&self) -> bool {
        self.notifications()
            .iter()
            .any(|n| n.level == NotificationLevel::Error)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }
}

/// Card widget answering with a fixed outcome.
pub struct FakeCardWidget {
    outcome: Result<String, String>,
    seen_secrets: Mutex<Vec<String>>,
}

impl FakeCardWidget {
    /// A widget whose payments go through with `reference`.
    pub fn approving(reference: &str) -> Self {
        Self {
            outcome: Ok(reference.to_owned()),
            seen_secrets: Mutex::new(Vec::new()),
        }
    }

    /// A widget whose payments are declined with `message`.
    pub fn declining(message: &str) -> Self {
        Self {
            outcome: Err(message.to_owned()),
            seen_secrets: Mutex::new(Vec::new()),
        }
    }

    /// Client secrets the widget was asked to confirm.
    pub fn seen_secrets(&self) -> Vec<String> {
        lock(&self.seen_secrets).clone()
    }
}

#[async_trait]
impl CardPaymentWidget for FakeCardWidget {
    async fn confirm(&self, client_secret: &str) -> Result<PaymentConfirmation, PaymentFailure> {
        lock(&self.seen_secrets).push(client_secret.to_owned());
        self.outcome
            .clone()
            .map(PaymentConfirmation::new)
            .map_err(PaymentFailure::new)
    }
}

/// `PayPal` buttons that approve or cancel every order.
pub struct FakePayPalWidget {
    approve: bool,
}

impl FakePayPalWidget {
    pub const fn approving() -> Self {
        Self { approve: true }
    }

    pub const fn cancelling() -> Self {
        Self { approve: false }
    }
}

#[async_trait]
impl PayPalWidget for FakePayPalWidget {
    async fn approve(&self, _provider_order_id: &str) -> Result<(), PaymentFailure> {
        if self.approve {
            Ok(())
        } else {
            Err(PaymentFailure::new("PayPal window closed"))
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Everything a test needs: the app state plus handles on its fakes.
pub struct Harness {
    pub state: AppState,
    pub backend: Arc<FakeBackend>,
    pub notifier: Arc<RecordingNotifier>,
    pub storage: Arc<dyn Storage>,
}

impl Harness {
    /// App state over in-memory storage and the standard catalog.
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    /// App state over `storage`, e.g. to reload persisted data.
    pub fn with_storage(storage: Arc<dyn Storage>) -> Self {
        let backend = Arc::new(FakeBackend::new(Arc::clone(&storage), catalog()));
        let notifier = Arc::new(RecordingNotifier::default());
        let backends = Backends {
            identity: backend.clone(),
            catalog: backend.clone(),
            orders: backend.clone(),
            payments: backend.clone(),
        };
        let state = AppState::from_parts(
            test_config(),
            Arc::clone(&storage),
            backends,
            notifier.clone(),
        );
        Self {
            state,
            backend,
            notifier,
            storage,
        }
    }

    /// Store a token and have the backend accept it.
    pub fn with_valid_token(self) -> Self {
        self.backend.accept_token("tok-valid");
        let _ = self.storage.set(storage_keys::AUTH_TOKEN, "tok-valid");
        self
    }

    /// Product from the standard catalog.
    pub fn product(&self, id: &str) -> Product {
        catalog()
            .into_iter()
            .find(|p| p.id.as_str() == id)
            .unwrap_or_else(|| panic!("no fixture product {id}"))
    }

    /// Add `times` units of the first variant of product `id`.
    pub fn add(&self, id: &str, times: u32) {
        let product = self.product(id);
        let Some(variant) = product.variants.first() else {
            panic!("fixture product {id} has no variant");
        };
        for _ in 0..times {
            self.state.cart().add_to_cart(&product, variant);
        }
    }

    /// The cart from the end-to-end scenario: 3.50 × 2 + 10.00 × 1.
    pub fn fill_reference_cart(&self) {
        self.add("apples", 2);
        self.add("melon", 1);
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration with the stock checkout settings (EUR, 5.00 delivery fee).
pub fn test_config() -> StorefrontConfig {
    let lookup = |key: &str| match key {
        "VERGER_API_URL" => Some("http://localhost:4000/api".to_string()),
        "VERGER_REDIRECT_DELAY_MS" => Some("0".to_string()),
        _ => None,
    };
    match StorefrontConfig::from_lookup(lookup) {
        Ok(config) => config,
        Err(e) => panic!("test configuration is invalid: {e}"),
    }
}

/// The signed-up shopper known to [`FakeBackend`].
pub fn profile() -> UserProfile {
    UserProfile {
        id: UserId::new("u-1"),
        name: "Marie Curie".to_string(),
        email: email("marie@example.fr"),
        phone: Some("0601020304".to_string()),
        loyalty_points: 120,
    }
}

pub fn email(raw: &str) -> Email {
    match Email::parse(raw) {
        Ok(email) => email,
        Err(e) => panic!("bad fixture email {raw}: {e}"),
    }
}

/// Standard catalog: apples (1 kg, 3.50), melon (piece, 10.00), free
/// parsley (piece, 0.00) and cherries with two weight variants.
pub fn catalog() -> Vec<Product> {
    vec![
        product(
            "apples",
            "Gala apples",
            "fruits",
            vec![weight_variant("apples-1kg", "1 kg bag", "3.50", 1000)],
        ),
        product(
            "melon",
            "Charentais melon",
            "fruits",
            vec![piece_variant("melon-each", "Single melon", "10.00")],
        ),
        product(
            "parsley",
            "Flat parsley",
            "herbs",
            vec![piece_variant("parsley-bunch", "Bunch", "0.00")],
        ),
        product(
            "cherries",
            "Burlat cherries",
            "fruits",
            vec![
                weight_variant("cherries-250", "", "4.20", 250),
                weight_variant("cherries-500", "", "7.90", 500),
            ],
        ),
    ]
}

fn product(id: &str, title: &str, category: &str, variants: Vec<Variant>) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_string(),
        image: Some(format!("/images/{id}.jpg")),
        category: category.to_string(),
        description: String::new(),
        variants,
    }
}

fn weight_variant(id: &str, name: &str, price: &str, grams: u32) -> Variant {
    let Some(grams) = NonZeroU32::new(grams) else {
        panic!("weight variant {id} needs a positive weight");
    };
    Variant {
        id: VariantId::new(id),
        name: name.to_string(),
        price: decimal(price),
        unit: Unit::Weight { grams },
        options: Vec::new(),
    }
}

fn piece_variant(id: &str, name: &str, price: &str) -> Variant {
    Variant {
        id: VariantId::new(id),
        name: name.to_string(),
        price: decimal(price),
        unit: Unit::Piece,
        options: Vec::new(),
    }
}

/// Parse a decimal literal.
pub fn decimal(raw: &str) -> Decimal {
    match raw.parse() {
        Ok(value) => value,
        Err(e) => panic!("bad decimal {raw}: {e}"),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
