//! Session manager - identity lifecycle and token exchange
//!
//! Owns the current [`Identity`], turns identity-provider sign-ins into
//! backend sessions through the token exchange, and keeps the persisted
//! access token in step with the provider session.
//!
//! A backend session only ever begins with a successful exchange: a provider
//! sign-in whose exchange fails leaves no current identity behind.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapters::ApiClient;
use crate::domain::result::{Error, Result};
use crate::domain::{AccessToken, Identity, ProfileUpdate, ProviderUser};
use crate::ports::{ErrorSink, IdentityProvider, TokenStore};

/// Backend endpoint that issues access tokens
pub const TOKEN_ENDPOINT: &str = "/auth/jwt";

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Snapshot of the session published to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    /// True until the first provider session state has been processed
    pub initializing: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: None,
            initializing: true,
        }
    }
}

/// Manages the single current identity
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    tokens: Arc<dyn TokenStore>,
    api: Arc<ApiClient>,
    errors: Arc<dyn ErrorSink>,
    default_photo_url: Option<String>,
    state: watch::Sender<SessionState>,
    // Held across each auth operation and each subscription event so the
    // subscription never races an explicit login's exchange
    auth_lock: AsyncMutex<()>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        tokens: Arc<dyn TokenStore>,
        api: Arc<ApiClient>,
        errors: Arc<dyn ErrorSink>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            provider,
            tokens,
            api,
            errors,
            default_photo_url: None,
            state,
            auth_lock: AsyncMutex::new(()),
        }
    }

    /// Photo set on new accounts registered without one
    pub fn with_default_photo_url(mut self, url: impl Into<String>) -> Self {
        self.default_photo_url = Some(url.into());
        self
    }

    // === State ===

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn is_initializing(&self) -> bool {
        self.state.borrow().initializing
    }

    /// Receiver that sees every published session state
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The provider's signed-in user, whether or not a session was restored
    pub fn provider_user(&self) -> Option<ProviderUser> {
        self.provider.current_user()
    }

    fn set_identity(&self, identity: Option<Identity>) {
        self.state.send_modify(|state| state.identity = identity);
    }

    // === Token exchange ===

    /// Exchange a provider-verified email for a backend access token and
    /// persist it
    pub async fn exchange_token(&self, email: &str) -> Result<AccessToken> {
        debug!("requesting access token");
        let response: TokenResponse = self
            .api
            .post(TOKEN_ENDPOINT, &TokenRequest { email })
            .await
            .map_err(|e| Error::TokenExchange(e.to_string()))?;

        let token = AccessToken::new(response.token);
        if token.is_empty() {
            return Err(Error::TokenExchange("backend returned an empty token".to_string()));
        }

        self.tokens.save(&token)?;
        Ok(token)
    }

    // === Auth operations ===

    /// Create a provider account, set its profile, and start a backend session
    pub async fn register_with_password(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        photo_url: Option<&str>,
    ) -> Result<Identity> {
        let _guard = self.auth_lock.lock().await;

        let user = self
            .provider
            .create_account(email, password)
            .await
            .map_err(as_registration)?;

        let photo_url = photo_url
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.default_photo_url.clone());
        let user = self
            .provider
            .update_profile(&ProfileUpdate::new(display_name, photo_url))
            .await
            .map_err(as_registration)?;

        let email = user.email.clone().unwrap_or_else(|| email.trim().to_string());
        let token = self.exchange_token(&email).await.map_err(as_registration)?;

        let identity = Identity::from_provider(&user, &email, token);
        self.set_identity(Some(identity.clone()));
        info!(provider = self.provider.name(), "registered new account");
        Ok(identity)
    }

    /// Verify credentials with the provider and start a backend session
    pub async fn login_with_password(&self, email: &str, password: &str) -> Result<Identity> {
        let _guard = self.auth_lock.lock().await;

        let user = self
            .provider
            .sign_in(email, password)
            .await
            .map_err(as_authentication)?;

        let email = user.email.clone().unwrap_or_else(|| email.trim().to_string());
        self.begin_backend_session(&user, &email).await
    }

    /// Run the provider's popup flow and start a backend session
    pub async fn login_with_provider(&self) -> Result<Identity> {
        let _guard = self.auth_lock.lock().await;

        let user = self
            .provider
            .sign_in_with_popup()
            .await
            .map_err(as_authentication)?;

        let email = user
            .email
            .clone()
            .ok_or_else(|| Error::authentication("provider account has no email address"))?;
        self.begin_backend_session(&user, &email).await
    }

    async fn begin_backend_session(&self, user: &ProviderUser, email: &str) -> Result<Identity> {
        let token = self.exchange_token(email).await.map_err(as_authentication)?;

        let identity = Identity::from_provider(user, email, token);
        self.set_identity(Some(identity.clone()));
        info!(provider = self.provider.name(), "signed in");
        Ok(identity)
    }

    /// End the provider session and clear the persisted token
    ///
    /// Local state is cleared even when the provider call fails; the failure
    /// is still returned.
    pub async fn logout(&self) -> Result<()> {
        let _guard = self.auth_lock.lock().await;

        let signed_out = self.provider.sign_out().await;
        let cleared = self.tokens.clear();
        self.set_identity(None);

        signed_out?;
        cleared?;
        info!("signed out");
        Ok(())
    }

    /// Update the provider profile of the current identity
    pub async fn update_display_profile(
        &self,
        display_name: &str,
        photo_url: Option<&str>,
    ) -> Result<Identity> {
        let _guard = self.auth_lock.lock().await;

        let mut identity = self.current_identity().ok_or(Error::NotAuthenticated)?;
        let update = ProfileUpdate::new(display_name, photo_url.map(str::to_string));
        let user = self.provider.update_profile(&update).await?;

        identity.refresh_profile(&user);
        self.set_identity(Some(identity.clone()));
        Ok(identity)
    }

    // === Session subscription ===

    /// Follow provider session changes until the returned handle is
    /// cancelled or dropped
    ///
    /// The task holds only a weak reference, so it stops on its own once the
    /// manager is gone.
    pub fn observe_session_changes(self: &Arc<Self>) -> SessionSubscription {
        let mut events = self.provider.subscribe();
        let manager: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.apply_session_event(event).await;
            }
            debug!("session subscription ended");
        });

        SessionSubscription {
            handle: Some(handle),
        }
    }

    /// Reconcile local state with the provider after a session event
    ///
    /// The provider's current session is authoritative, so an event that was
    /// queued before a later login cannot undo that login.
    pub(crate) async fn apply_session_event(&self, event: Option<ProviderUser>) {
        let _guard = self.auth_lock.lock().await;
        debug!(signed_in = event.is_some(), "provider session event");

        match self.provider.current_user() {
            Some(user) => self.restore_session(user).await,
            None => {
                if self.current_identity().is_some() {
                    info!("provider session ended");
                }
                self.clear_session();
            }
        }

        self.state.send_modify(|state| state.initializing = false);
    }

    async fn restore_session(&self, user: ProviderUser) {
        if let Some(mut identity) = self.current_identity() {
            if identity.uid == user.uid && identity.is_backend_authenticated() {
                identity.refresh_profile(&user);
                self.set_identity(Some(identity));
                return;
            }
        }

        let Some(email) = user.email.clone() else {
            self.errors.report(
                "session restore",
                &Error::authentication("provider account has no email address"),
            );
            self.clear_session();
            return;
        };

        match self.exchange_token(&email).await {
            Ok(token) => {
                self.set_identity(Some(Identity::from_provider(&user, &email, token)));
                info!(provider = self.provider.name(), "session restored");
            }
            Err(e) => {
                warn!("session restore failed, continuing signed out");
                self.errors.report("session restore", &e);
                self.clear_session();
            }
        }
    }

    /// Drop the identity and any persisted token
    fn clear_session(&self) {
        if let Err(e) = self.tokens.clear() {
            self.errors.report("clearing access token", &e);
        }
        self.set_identity(None);
    }
}

fn as_registration(error: Error) -> Error {
    match error {
        Error::Registration(_) => error,
        other => Error::Registration(other.to_string()),
    }
}

fn as_authentication(error: Error) -> Error {
    match error {
        Error::Authentication(_) => error,
        other => Error::Authentication(other.to_string()),
    }
}

/// Handle to a running session subscription
///
/// Dropping the handle cancels the subscription.
#[derive(Debug)]
pub struct SessionSubscription {
    handle: Option<JoinHandle<()>>,
}

impl SessionSubscription {
    /// Stop following provider session changes
    pub fn cancel(mut self) {
        self.abort();
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.abort();
    }
}
