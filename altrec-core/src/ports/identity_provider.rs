//! Identity provider port
//!
//! Any provider offering these six capabilities is substitutable: account
//! creation, password sign-in, interactive popup sign-in, sign-out, profile
//! update, and a session-state stream.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::result::Result;
use crate::domain::{ProfileUpdate, ProviderUser};

/// Stream of provider session states
///
/// The first item is the state at subscription time; later items follow in
/// the order the provider emits them. `None` means no provider session.
pub type SessionEvents = mpsc::UnboundedReceiver<Option<ProviderUser>>;

/// Third-party identity provider
///
/// Implementations report failures with the error kind the caller expects:
/// `Registration` from `create_account`, `Authentication` from the sign-in
/// methods, `NotAuthenticated` from `update_profile` without a session.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name (e.g., "firebase", "local")
    fn name(&self) -> &str;

    /// Create an account and sign it in
    async fn create_account(&self, email: &str, password: &str) -> Result<ProviderUser>;

    /// Verify credentials and sign in
    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser>;

    /// Run the provider's interactive popup flow
    async fn sign_in_with_popup(&self) -> Result<ProviderUser>;

    /// End the provider session; a no-op when none exists
    async fn sign_out(&self) -> Result<()>;

    /// Update the signed-in user's profile fields
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<ProviderUser>;

    /// The signed-in user, if any
    fn current_user(&self) -> Option<ProviderUser>;

    /// Subscribe to session-state changes
    fn subscribe(&self) -> SessionEvents;
}

/// Fan-out of provider session changes to subscribers
///
/// Providers hold one of these and call [`SessionNotifier::publish`] whenever
/// their session changes. Closed subscribers are dropped on the next publish.
#[derive(Debug, Default)]
pub struct SessionNotifier {
    inner: Mutex<NotifierState>,
}

#[derive(Debug, Default)]
struct NotifierState {
    current: Option<ProviderUser>,
    subscribers: Vec<mpsc::UnboundedSender<Option<ProviderUser>>>,
}

impl SessionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current provider session
    pub fn current(&self) -> Option<ProviderUser> {
        self.lock().current.clone()
    }

    /// Register a subscriber; it immediately receives the current state
    pub fn subscribe(&self) -> SessionEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        // A fresh receiver is alive, so this send cannot fail
        let _ = tx.send(state.current.clone());
        state.subscribers.push(tx);
        rx
    }

    /// Record a new session state and deliver it to every live subscriber
    pub fn publish(&self, user: Option<ProviderUser>) {
        let mut state = self.lock();
        state.current = user.clone();
        state.subscribers.retain(|tx| tx.send(user.clone()).is_ok());
    }

    /// Update the stored state without emitting an event
    ///
    /// Profile edits do not change who is signed in, so subscribers are not
    /// told about them.
    pub fn replace_silently(&self, user: Option<ProviderUser>) {
        self.lock().current = user;
    }

    /// Number of subscribers that have not been dropped yet
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock();
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NotifierState> {
        // A panic while holding this lock cannot leave the state half-written
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
