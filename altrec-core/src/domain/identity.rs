//! Identity domain model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque bearer credential issued by the backend for a verified email
///
/// Expiry is not tracked here; the backend rejects stale tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// User as reported by the identity provider
///
/// Exists independently of any backend session: a provider sign-in that is
/// not followed by a token exchange leaves only this behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUser {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl ProviderUser {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: Some(email.into()),
            display_name: None,
            photo_url: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }
}

/// Profile fields pushed to the identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    pub fn new(display_name: impl Into<String>, photo_url: Option<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            photo_url,
        }
    }

    /// Apply these fields over an existing provider user
    pub fn apply_to(&self, user: &mut ProviderUser) {
        if let Some(name) = &self.display_name {
            user.display_name = Some(name.clone());
        }
        if let Some(url) = &self.photo_url {
            user.photo_url = Some(url.clone());
        }
    }
}

/// The currently authenticated user
///
/// A set `access_token` was issued by the backend for exactly `email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(skip)]
    pub access_token: Option<AccessToken>,
}

impl Identity {
    /// Build an identity from a provider user once its email is known
    pub fn from_provider(user: &ProviderUser, email: &str, access_token: AccessToken) -> Self {
        Self {
            uid: user.uid.clone(),
            email: email.to_string(),
            display_name: user.display_name.clone().unwrap_or_default(),
            photo_url: user.photo_url.clone(),
            access_token: Some(access_token),
        }
    }

    /// Whether a backend session backs this identity
    pub fn is_backend_authenticated(&self) -> bool {
        self.access_token.as_ref().is_some_and(|t| !t.is_empty())
    }

    /// First word of the display name, for greetings
    pub fn first_name(&self) -> &str {
        self.display_name.split_whitespace().next().unwrap_or("User")
    }

    /// Refresh profile fields from the provider without touching the token
    pub fn refresh_profile(&mut self, user: &ProviderUser) {
        if let Some(name) = &user.display_name {
            self.display_name = name.clone();
        }
        self.photo_url = user.photo_url.clone();
    }
}
