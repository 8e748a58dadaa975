//! Application state shared across front-end views.

use std::sync::Arc;

use crate::api::{ApiClient, CatalogApi, IdentityApi, OrderApi, PaymentApi};
use crate::auth::{CredentialStore, SessionGuard, SessionState};
use crate::cart::CartStore;
use crate::checkout::Checkout;
use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::notify::{Notifier, TracingNotifier};
use crate::storage::{FileStorage, Storage};
use crate::store::PersistedStore;
use crate::zones::ZoneDirectory;

/// Backend services, one handle per concern.
#[derive(Clone)]
pub struct Backends {
    pub identity: Arc<dyn IdentityApi>,
    pub catalog: Arc<dyn CatalogApi>,
    pub orders: Arc<dyn OrderApi>,
    pub payments: Arc<dyn PaymentApi>,
}

impl Backends {
    /// Route every concern through one HTTP client.
    #[must_use]
    pub fn from_client(client: &ApiClient) -> Self {
        Self {
            identity: Arc::new(client.clone()),
            catalog: Arc::new(client.clone()),
            orders: Arc::new(client.clone()),
            payments: Arc::new(client.clone()),
        }
    }
}

/// Application state shared across all views.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// persisted store, the backend and the configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backends: Backends,
    cart: CartStore,
    session: SessionGuard,
    zones: ZoneDirectory,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create the state for a configured deployment: file storage in the
    /// state directory and the HTTP backend. Notifications are only logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be created or the HTTP
    /// client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, AppError> {
        Self::with_notifier(config, Arc::new(TracingNotifier))
    }

    /// Like [`new`](Self::new), delivering notifications to `notifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be created or the HTTP
    /// client cannot be built.
    pub fn with_notifier(
        config: StorefrontConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppError> {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(&config.state_dir)?);
        let client = ApiClient::new(
            &config.api_url,
            config.http_timeout,
            CredentialStore::new(Arc::clone(&storage)),
        )?;

        Ok(Self::from_parts(
            config,
            storage,
            Backends::from_client(&client),
            notifier,
        ))
    }

    /// Assemble the state from explicit parts.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        storage: Arc<dyn Storage>,
        backends: Backends,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let store = PersistedStore::load(Arc::clone(&storage));
        let cart = CartStore::new(store.clone());
        let session = SessionGuard::new(
            Arc::clone(&backends.identity),
            CredentialStore::new(storage),
            store,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backends,
                cart,
                session,
                zones: ZoneDirectory::default(),
                notifier,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backends(&self) -> &Backends {
        &self.inner.backends
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn session(&self) -> &SessionGuard {
        &self.inner.session
    }

    #[must_use]
    pub fn zones(&self) -> &ZoneDirectory {
        &self.inner.zones
    }

    #[must_use]
    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.inner.notifier
    }

    /// Application start: resolve the stored session so a rejected token is
    /// dropped before any other backend call carries it.
    pub async fn start(&self) -> SessionState {
        let state = self.inner.session.reconcile().await;
        tracing::debug!(
            authenticated = state.is_authenticated(),
            "Session resolved at startup"
        );
        state
    }

    /// Start a checkout over the current cart, with contact fields filled
    /// from the signed-in profile.
    #[must_use]
    pub fn checkout(&self) -> Checkout {
        let mut checkout = Checkout::new(
            self.inner.cart.clone(),
            self.inner.zones.clone(),
            Arc::clone(&self.inner.backends.orders),
            Arc::clone(&self.inner.backends.payments),
            Arc::clone(&self.inner.notifier),
            self.inner.config.checkout.clone(),
        );
        if let Some(user) = self.inner.session.user()
            && let Ok(draft) = checkout.draft_mut()
        {
            draft.prefill_from(&user);
        }
        checkout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("cart", &self.inner.cart)
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}
