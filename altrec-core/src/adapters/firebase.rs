//! Firebase identity provider
//!
//! Talks to the Identity Toolkit REST API for account creation, password
//! sign-in and profile updates. The provider session (ID token and refresh
//! token) is held in memory, and in `provider.json` when a state file is
//! attached. Expired ID tokens are renewed through the Secure Token API.
//!
//! API Documentation: https://firebase.google.com/docs/reference/rest/auth

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider_state::{ProviderSnapshot, ProviderStateFile};
use crate::domain::result::{Error, Result};
use crate::domain::{ProfileUpdate, ProviderUser};
use crate::ports::{IdentityProvider, SessionEvents, SessionNotifier};

/// Default production API URL
const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";

/// Environment variable to override the Identity Toolkit base URL
/// (for the auth emulator or tests).
pub const FIREBASE_AUTH_URL_ENV: &str = "ALTREC_FIREBASE_AUTH_URL";

/// Get the Identity Toolkit base URL, checking environment variable first
pub fn get_base_url() -> String {
    std::env::var(FIREBASE_AUTH_URL_ENV).unwrap_or_else(|_| IDENTITY_TOOLKIT_URL.to_string())
}

/// Default production token refresh URL
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com";

/// Environment variable to override the Secure Token base URL
pub const FIREBASE_TOKEN_URL_ENV: &str = "ALTREC_FIREBASE_TOKEN_URL";

/// Get the Secure Token base URL, checking environment variable first
pub fn get_token_url() -> String {
    std::env::var(FIREBASE_TOKEN_URL_ENV).unwrap_or_else(|_| SECURE_TOKEN_URL.to_string())
}

// =============================================================================
// API Request/Response Models
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

impl<'a> UpdateRequest<'a> {
    fn new(id_token: &'a str, update: &'a ProfileUpdate) -> Self {
        Self {
            id_token,
            display_name: update.display_name.as_deref(),
            photo_url: update.photo_url.as_deref(),
            return_secure_token: false,
        }
    }
}

/// Account payload shared by signUp, signInWithPassword and update
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    profile_picture: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Secure Token API answer; unlike the toolkit it uses snake_case
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl AccountResponse {
    fn into_user(self) -> ProviderUser {
        ProviderUser {
            uid: self.local_id,
            email: self.email,
            display_name: self.display_name.filter(|n| !n.is_empty()),
            photo_url: self.photo_url.or(self.profile_picture).filter(|u| !u.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Which operation failed, to choose the error kind
#[derive(Debug, Clone, Copy)]
enum Operation {
    SignUp,
    SignIn,
    Update,
    Refresh,
}

/// Split an error code from its detail
///
/// Codes may carry detail after " : ", e.g. "WEAK_PASSWORD : Password should be..."
fn split_error_code(code: &str) -> (&str, Option<&str>) {
    match code.split_once(" : ") {
        Some((name, detail)) => (name.trim(), Some(detail.trim())),
        None => (code.trim(), None),
    }
}

/// Turn an Identity Toolkit error code into a readable message
fn describe_error_code(code: &str) -> String {
    let (name, detail) = split_error_code(code);
    match name {
        "EMAIL_EXISTS" => "the email address is already in use".to_string(),
        "INVALID_EMAIL" => "the email address is badly formatted".to_string(),
        "WEAK_PASSWORD" => detail
            .map(str::to_string)
            .unwrap_or_else(|| "the password is too weak".to_string()),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "invalid email or password".to_string()
        }
        "USER_DISABLED" => "this account has been disabled".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "too many attempts, try again later".to_string(),
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "INVALID_REFRESH_TOKEN" => {
            "the sign-in session has expired".to_string()
        }
        other => other.to_lowercase().replace('_', " "),
    }
}

/// A failed provider call, before it is mapped to an error kind
#[derive(Debug)]
struct ProviderFailure {
    code: Option<String>,
    message: String,
}

impl ProviderFailure {
    fn from_body(status: reqwest::StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => Self {
                code: Some(split_error_code(&envelope.error.message).0.to_string()),
                message: describe_error_code(&envelope.error.message),
            },
            Err(_) => Self {
                code: None,
                message: format!("identity provider returned HTTP {}", status.as_u16()),
            },
        }
    }

    /// The ID token is no longer accepted but the refresh token may be
    fn is_expired_id_token(&self) -> bool {
        matches!(self.code.as_deref(), Some("INVALID_ID_TOKEN" | "TOKEN_EXPIRED"))
    }

    fn into_error(self, op: Operation) -> Error {
        FirebaseIdentityProvider::error_for(op, self.message)
    }
}

// =============================================================================
// Firebase provider
// =============================================================================

#[derive(Debug, Clone)]
struct ProviderSession {
    user: ProviderUser,
    id_token: String,
    refresh_token: Option<String>,
}

/// Identity provider backed by Firebase Authentication
#[derive(Debug)]
pub struct FirebaseIdentityProvider {
    client: Client,
    api_key: String,
    base_url: String,
    token_url: String,
    session: Mutex<Option<ProviderSession>>,
    notifier: SessionNotifier,
    state: Option<ProviderStateFile>,
}

impl FirebaseIdentityProvider {
    /// Create a provider for the given web API key.
    ///
    /// Uses the `ALTREC_FIREBASE_AUTH_URL` and `ALTREC_FIREBASE_TOKEN_URL`
    /// environment variables if set, otherwise the production endpoints.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::new_with_urls(api_key, &get_base_url(), &get_token_url())
    }

    pub fn new_with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        Self::new_with_urls(api_key, base_url, &get_token_url())
    }

    pub fn new_with_urls(api_key: &str, base_url: &str, token_url: &str) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Firebase API key cannot be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url: token_url.trim_end_matches('/').to_string(),
            session: Mutex::new(None),
            notifier: SessionNotifier::new(),
            state: None,
        })
    }

    /// Restore the session saved by a previous run and keep saving it
    ///
    /// A restored ID token may have expired; the first call that hits the
    /// expiry renews it with the saved refresh token.
    pub fn with_state_file(mut self, state: ProviderStateFile) -> Result<Self> {
        let snapshot = state.load()?;
        if let (Some(user), Some(id_token)) = (snapshot.user, snapshot.id_token) {
            *self.session.get_mut().unwrap_or_else(|p| p.into_inner()) = Some(ProviderSession {
                user: user.clone(),
                id_token,
                refresh_token: snapshot.refresh_token,
            });
            self.notifier.replace_silently(Some(user));
        }
        self.state = Some(state);
        Ok(self)
    }

    fn persist(&self) -> Result<()> {
        let Some(state) = &self.state else {
            return Ok(());
        };
        let session = self.session.lock().unwrap_or_else(|p| p.into_inner()).clone();
        state.save(&ProviderSnapshot {
            user: session.as_ref().map(|s| s.user.clone()),
            id_token: session.as_ref().map(|s| s.id_token.clone()),
            refresh_token: session.and_then(|s| s.refresh_token),
            accounts: Vec::new(),
        })
    }

    async fn call<B: Serialize>(&self, method: &str, body: &B, op: Operation) -> Result<AccountResponse> {
        self.send(method, body).await.map_err(|f| f.into_error(op))
    }

    async fn send<B: Serialize>(
        &self,
        method: &str,
        body: &B,
    ) -> std::result::Result<AccountResponse, ProviderFailure> {
        let url = format!("{}/v1/accounts:{}", self.base_url, method);
        debug!(method, "identity toolkit request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(Self::map_request_error)?;

        if !status.is_success() {
            return Err(ProviderFailure::from_body(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| ProviderFailure {
            code: None,
            message: format!("unexpected identity provider response: {}", e),
        })
    }

    fn error_for(op: Operation, message: String) -> Error {
        match op {
            Operation::SignUp => Error::Registration(message),
            Operation::SignIn | Operation::Refresh => Error::Authentication(message),
            Operation::Update => Error::Validation(message),
        }
    }

    /// Transport failures keep the operation's error kind so callers see
    /// registration or authentication failures consistently
    fn map_request_error(error: reqwest::Error) -> ProviderFailure {
        let message = if error.is_timeout() {
            "identity provider timed out".to_string()
        } else if error.is_connect() {
            "unable to reach identity provider".to_string()
        } else {
            format!("identity provider request failed: {}", error)
        };
        ProviderFailure { code: None, message }
    }

    /// Trade the refresh token for a new ID token and keep both
    ///
    /// A refresh token the provider rejects ends the session; transport
    /// and server failures leave it in place.
    async fn refresh_session(&self) -> Result<String> {
        let refresh_token = self
            .session
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .and_then(|s| s.refresh_token.clone());
        let Some(refresh_token) = refresh_token else {
            warn!("no refresh token for expired session, ending session");
            self.end_session()?;
            return Err(Self::error_for(
                Operation::Refresh,
                describe_error_code("TOKEN_EXPIRED"),
            ));
        };

        let url = format!("{}/v1/token", self.token_url);
        debug!("secure token refresh");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Self::map_request_error(e).into_error(Operation::Refresh))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Self::map_request_error(e).into_error(Operation::Refresh))?;

        if !status.is_success() {
            let failure = ProviderFailure::from_body(status, &text);
            if status.is_client_error() {
                warn!(code = failure.code.as_deref().unwrap_or("-"), "refresh token rejected, ending session");
                self.end_session()?;
            }
            return Err(failure.into_error(Operation::Refresh));
        }

        let refreshed: RefreshResponse = serde_json::from_str(&text).map_err(|e| {
            Self::error_for(Operation::Refresh, format!("unexpected secure token response: {}", e))
        })?;

        {
            let mut guard = self.session.lock().unwrap_or_else(|p| p.into_inner());
            let Some(session) = guard.as_mut() else {
                return Err(Error::NotAuthenticated);
            };
            session.id_token = refreshed.id_token.clone();
            if let Some(token) = refreshed.refresh_token {
                session.refresh_token = Some(token);
            }
        }
        self.persist()?;
        Ok(refreshed.id_token)
    }

    fn end_session(&self) -> Result<()> {
        let had_session = self
            .session
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
            .is_some();
        if had_session {
            self.notifier.publish(None);
        }
        self.persist()
    }

    fn start_session(&self, account: AccountResponse, op: Operation) -> Result<ProviderUser> {
        let id_token = account
            .id_token
            .clone()
            .ok_or_else(|| Self::error_for(op, "identity provider returned no ID token".to_string()))?;
        let refresh_token = account.refresh_token.clone();
        let user = account.into_user();

        *self.session.lock().unwrap_or_else(|p| p.into_inner()) = Some(ProviderSession {
            user: user.clone(),
            id_token,
            refresh_token,
        });
        self.notifier.publish(Some(user.clone()));
        self.persist()?;
        Ok(user)
    }

    fn id_token(&self) -> Option<String> {
        self.session
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map(|s| s.id_token.clone())
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    fn name(&self) -> &str {
        "firebase"
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<ProviderUser> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account = self.call("signUp", &body, Operation::SignUp).await?;
        self.start_session(account, Operation::SignUp)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account = self.call("signInWithPassword", &body, Operation::SignIn).await?;
        self.start_session(account, Operation::SignIn)
    }

    async fn sign_in_with_popup(&self) -> Result<ProviderUser> {
        Err(Error::authentication(
            "interactive popup sign-in needs a browser and is not available here",
        ))
    }

    async fn sign_out(&self) -> Result<()> {
        self.end_session()
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<ProviderUser> {
        let id_token = self.id_token().ok_or(Error::NotAuthenticated)?;
        let account = match self.send("update", &UpdateRequest::new(&id_token, update)).await {
            Err(failure) if failure.is_expired_id_token() => {
                debug!("ID token expired, refreshing");
                let id_token = self.refresh_session().await?;
                self.call("update", &UpdateRequest::new(&id_token, update), Operation::Update)
                    .await?
            }
            result => result.map_err(|f| f.into_error(Operation::Update))?,
        };
        let user = account.into_user();

        if let Some(session) = self.session.lock().unwrap_or_else(|p| p.into_inner()).as_mut() {
            session.user = user.clone();
        }
        self.notifier.replace_silently(Some(user.clone()));
        self.persist()?;
        Ok(user)
    }

    fn current_user(&self) -> Option<ProviderUser> {
        self.notifier.current()
    }

    fn subscribe(&self) -> SessionEvents {
        self.notifier.subscribe()
    }
}
