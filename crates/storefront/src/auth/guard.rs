//! Session guard.
//!
//! Owns the answer to "who is signed in" for the rest of the client. The
//! profile lives in the shared snapshot; the guard adds a phase so that a
//! view rendered before the first reconciliation shows a loading state
//! instead of a logged-out one.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::SecretString;
use tracing::instrument;

use verger_core::Email;

use super::{AuthError, CredentialStore, MIN_NAME_LENGTH, validate_password};
use crate::api::{
    ApiError, AuthResponse, ForgotPasswordRequest, IdentityApi, LoginRequest, ProfileUpdate,
    RegisterRequest,
};
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::models::UserProfile;
use crate::navigation::{Redirect, is_protected};
use crate::store::PersistedStore;

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The stored token has not been checked yet.
    Indeterminate,
    /// Signed in with a validated profile.
    Authenticated(UserProfile),
    /// Nobody is signed in.
    Unauthenticated,
}

impl SessionState {
    /// Whether a validated profile is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Decision for a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Render the view.
    Allow,
    /// Session not resolved yet; render a loading state.
    Pending,
    /// Protected view and nobody signed in.
    RedirectToLogin(Redirect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Indeterminate,
    Resolved,
}

/// Reconciles the stored token with the identity endpoint and gates
/// protected views.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<SessionGuardInner>,
}

struct SessionGuardInner {
    identity: Arc<dyn IdentityApi>,
    credentials: CredentialStore,
    store: PersistedStore,
    phase: RwLock<Phase>,
}

impl SessionGuard {
    /// Create a guard. The session stays indeterminate until
    /// [`reconcile`](Self::reconcile) runs.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityApi>,
        credentials: CredentialStore,
        store: PersistedStore,
    ) -> Self {
        Self {
            inner: Arc::new(SessionGuardInner {
                identity,
                credentials,
                store,
                phase: RwLock::new(Phase::Indeterminate),
            }),
        }
    }

    fn phase(&self) -> Phase {
        *self
            .inner
            .phase
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: Phase) {
        *self
            .inner
            .phase
            .write()
            .unwrap_or_else(PoisonError::into_inner) = phase;
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.phase() == Phase::Indeterminate {
            return SessionState::Indeterminate;
        }
        self.inner
            .store
            .read(|snapshot| snapshot.user.clone())
            .map_or(SessionState::Unauthenticated, SessionState::Authenticated)
    }

    /// The signed-in profile, once resolved.
    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        match self.state() {
            SessionState::Authenticated(user) => Some(user),
            SessionState::Indeterminate | SessionState::Unauthenticated => None,
        }
    }

    /// Re-validate the stored token.
    ///
    /// Enters [`SessionState::Indeterminate`] for the duration of the check.
    /// Any failure of the identity call discards the token and clears the
    /// session.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> SessionState {
        self.set_phase(Phase::Indeterminate);
        self.revalidate().await;
        self.set_phase(Phase::Resolved);
        self.state()
    }

    /// Silently re-validate, then decide access to `path`.
    ///
    /// Unlike [`reconcile`](Self::reconcile), an already resolved session
    /// never goes back to indeterminate while the check runs.
    #[instrument(skip(self))]
    pub async fn on_navigation(&self, path: &str) -> Access {
        self.revalidate().await;
        self.set_phase(Phase::Resolved);
        self.authorize(path)
    }

    /// Decide access to `path` from the current state, without any I/O.
    #[must_use]
    pub fn authorize(&self, path: &str) -> Access {
        if !is_protected(path) {
            return Access::Allow;
        }
        match self.state() {
            SessionState::Authenticated(_) => Access::Allow,
            SessionState::Indeterminate => Access::Pending,
            SessionState::Unauthenticated => Access::RedirectToLogin(Redirect::to_login(path)),
        }
    }

    async fn revalidate(&self) {
        if !self.inner.credentials.has_token() {
            self.clear_profile();
            return;
        }

        match self.inner.identity.me().await {
            Ok(profile) => {
                tracing::debug!(user_id = %profile.id, "Session token validated");
                set_sentry_user(&profile.id, Some(profile.email.as_str()));
                self.inner.store.update(|snapshot| snapshot.user = Some(profile));
            }
            Err(e) => {
                tracing::info!(error = %e, "Stored token rejected, clearing session");
                self.discard_session();
            }
        }
    }

    fn clear_profile(&self) {
        if self.inner.store.read(|snapshot| snapshot.user.is_some()) {
            self.inner.store.update(|snapshot| snapshot.user = None);
        }
    }

    fn discard_session(&self) {
        if let Err(e) = self.inner.credentials.clear() {
            tracing::warn!(error = %e, "Failed to remove stored token");
        }
        self.clear_profile();
        clear_sentry_user();
    }

    fn establish(&self, response: AuthResponse) -> Result<UserProfile, AuthError> {
        self.inner
            .credentials
            .set_token(&SecretString::from(response.token))?;
        let profile = response.user;
        self.inner
            .store
            .update(|snapshot| snapshot.user = Some(profile.clone()));
        self.set_phase(Phase::Resolved);
        set_sentry_user(&profile.id, Some(profile.email.as_str()));
        Ok(profile)
    }

    // =========================================================================
    // Identity operations
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the backend rejects the
    /// credentials, or another error if the request or token storage fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let request = LoginRequest {
            email,
            password: password.to_owned(),
        };
        let response = self
            .inner
            .identity
            .login(&request)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized(_) => AuthError::InvalidCredentials,
                other => AuthError::Api(other),
            })?;

        let profile = self.establish(response)?;
        add_breadcrumb("auth", "Signed in", None);
        tracing::info!(user_id = %profile.id, "User signed in");
        Ok(profile)
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a short name, bad email or weak
    /// password, or an error if the request or token storage fails.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password: &str,
    ) -> Result<UserProfile, AuthError> {
        let name = name.trim();
        if name.chars().count() < MIN_NAME_LENGTH {
            return Err(AuthError::InvalidName);
        }
        let email = Email::parse(email)?;
        validate_password(password)?;

        let request = RegisterRequest {
            name: name.to_owned(),
            email,
            phone: phone
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned),
            password: password.to_owned(),
        };
        let response = self.inner.identity.register(&request).await?;

        let profile = self.establish(response)?;
        add_breadcrumb("auth", "Registered", None);
        tracing::info!(user_id = %profile.id, "User registered");
        Ok(profile)
    }

    /// Sign out: discard the token and the profile. The cart is kept.
    pub fn logout(&self) {
        self.discard_session();
        self.set_phase(Phase::Resolved);
        add_breadcrumb("auth", "Signed out", None);
        tracing::info!("User signed out");
    }

    /// Update the signed-in profile.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] without a session. A rejected
    /// token also clears the session before the error is returned.
    #[instrument(skip(self))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, AuthError> {
        if !self.state().is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }

        match self.inner.identity.update_profile(update).await {
            Ok(profile) => {
                self.inner
                    .store
                    .update(|snapshot| snapshot.user = Some(profile.clone()));
                Ok(profile)
            }
            Err(e) if e.is_unauthorized() => {
                self.discard_session();
                Err(AuthError::NotAuthenticated)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Request a password reset email.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed email or a failed request.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let request = ForgotPasswordRequest {
            email: Email::parse(email)?,
        };
        self.inner.identity.forgot_password(&request).await?;
        Ok(())
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("phase", &self.phase())
            .field("credentials", &self.inner.credentials)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::models::storage_keys;
    use crate::storage::{MemoryStorage, Storage};

    struct StubIdentity {
        me: Mutex<Option<UserProfile>>,
    }

    #[async_trait]
    impl IdentityApi for StubIdentity {
        async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
            if request.password == "letmein1" {
                Ok(AuthResponse {
                    token: "tok-new".to_string(),
                    user: profile(),
                })
            } else {
                Err(ApiError::Unauthorized("bad password".to_string()))
            }
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
            Ok(AuthResponse {
                token: "tok-reg".to_string(),
                user: profile(),
            })
        }

        async fn me(&self) -> Result<UserProfile, ApiError> {
            self.me
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ApiError::Unauthorized(String::new()))
        }

        async fn update_profile(&self, _update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
            Err(ApiError::Unauthorized(String::new()))
        }

        async fn forgot_password(&self, _request: &ForgotPasswordRequest) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn profile() -> UserProfile {
        serde_json::from_value(serde_json::json!({
            "id": "u-1",
            "name": "Marie",
            "email": "marie@example.fr"
        }))
        .unwrap()
    }

    fn guard(me: Option<UserProfile>, token: Option<&str>) -> (SessionGuard, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        if let Some(token) = token {
            storage.set(storage_keys::AUTH_TOKEN, token).unwrap();
        }
        let identity = Arc::new(StubIdentity {
            me: Mutex::new(me),
        });
        let guard = SessionGuard::new(
            identity,
            CredentialStore::new(storage.clone()),
            PersistedStore::load(storage.clone()),
        );
        (guard, storage)
    }

    #[tokio::test]
    async fn test_starts_indeterminate_and_pending() {
        let (guard, _) = guard(None, None);
        assert_eq!(guard.state(), SessionState::Indeterminate);
        assert_eq!(guard.authorize("/account"), Access::Pending);
        assert_eq!(guard.authorize("/products"), Access::Allow);
    }

    #[tokio::test]
    async fn test_reconcile_without_token() {
        let (guard, _) = guard(Some(profile()), None);
        assert_eq!(guard.reconcile().await, SessionState::Unauthenticated);
        assert_eq!(
            guard.authorize("/orders"),
            Access::RedirectToLogin(Redirect::to("/login?redirect=%2Forders"))
        );
    }

    #[tokio::test]
    async fn test_reconcile_with_valid_token() {
        let (guard, _) = guard(Some(profile()), Some("tok"));
        assert!(guard.reconcile().await.is_authenticated());
        assert_eq!(guard.authorize("/checkout"), Access::Allow);
    }

    #[tokio::test]
    async fn test_rejected_token_is_discarded() {
        let (guard, storage) = guard(None, Some("tok-stale"));
        assert_eq!(guard.reconcile().await, SessionState::Unauthenticated);
        assert!(!storage.contains(storage_keys::AUTH_TOKEN));
    }

    #[tokio::test]
    async fn test_login_maps_unauthorized_to_invalid_credentials() {
        let (guard, _) = guard(None, None);
        let err = guard.login("marie@example.fr", "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_then_logout() {
        let (guard, storage) = guard(None, None);
        guard.login("marie@example.fr", "letmein1").await.unwrap();
        assert!(guard.state().is_authenticated());
        assert_eq!(
            storage.get(storage_keys::AUTH_TOKEN).unwrap().as_deref(),
            Some("tok-new")
        );

        guard.logout();
        assert_eq!(guard.state(), SessionState::Unauthenticated);
        assert!(!storage.contains(storage_keys::AUTH_TOKEN));
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let (guard, _) = guard(None, None);
        assert!(matches!(
            guard.register("M", "marie@example.fr", None, "password1").await,
            Err(AuthError::InvalidName)
        ));
        assert!(matches!(
            guard.register("Marie", "not-an-email", None, "password1").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            guard.register("Marie", "marie@example.fr", None, "short").await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_requires_session() {
        let (guard, _) = guard(None, None);
        guard.reconcile().await;
        assert!(matches!(
            guard.update_profile(&ProfileUpdate::default()).await,
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_on_navigation_revalidates() {
        let (guard, _) = guard(Some(profile()), Some("tok"));
        guard.reconcile().await;
        assert_eq!(guard.on_navigation("/account").await, Access::Allow);
    }
}
