//! In-memory identity provider
//!
//! Accounts live in process memory, which makes this provider useful for
//! demos and tests. It follows the same rules as a hosted provider: unique
//! emails, passwords of at least six characters, and session events only
//! when the signed-in user actually changes.
//!
//! Opened with a [`ProviderStateFile`], accounts and the signed-in user are
//! written back after every change so the next process picks them up.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::provider_state::{hash_password, verify_password, ProviderSnapshot, ProviderStateFile, StoredAccount};
use crate::domain::result::{Error, Result};
use crate::domain::{ProfileUpdate, ProviderUser};
use crate::ports::{IdentityProvider, SessionEvents, SessionNotifier};

/// Shortest password the provider accepts
pub const MIN_PASSWORD_LEN: usize = 6;

/// Identity provider backed by an in-memory account table
#[derive(Debug, Default)]
pub struct LocalIdentityProvider {
    accounts: Mutex<HashMap<String, StoredAccount>>,
    popup_account: Mutex<Option<ProviderUser>>,
    notifier: SessionNotifier,
    state: Option<ProviderStateFile>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that restores and persists its accounts and session
    pub fn open(state: ProviderStateFile) -> Result<Self> {
        let snapshot = state.load()?;
        let accounts = snapshot
            .accounts
            .into_iter()
            .filter_map(|account| {
                let key = normalize_email(account.user.email.as_deref()?);
                Some((key, account))
            })
            .collect();

        let provider = Self {
            accounts: Mutex::new(accounts),
            state: Some(state),
            ..Self::default()
        };
        provider.notifier.replace_silently(snapshot.user);
        Ok(provider)
    }

    /// Seed a password account
    pub fn with_account(self, email: &str, password: &str, display_name: &str) -> Result<Self> {
        let user = ProviderUser::new(Uuid::new_v4().to_string(), email).with_display_name(display_name);
        self.lock_accounts().insert(
            normalize_email(email),
            StoredAccount {
                user,
                password_hash: Some(hash_password(password)?),
            },
        );
        Ok(self)
    }

    /// Account the popup flow signs in; without one the popup reports cancellation
    pub fn with_popup_account(self, user: ProviderUser) -> Self {
        *self.popup_account.lock().unwrap_or_else(|p| p.into_inner()) = Some(user);
        self
    }

    pub fn account_count(&self) -> usize {
        self.lock_accounts().len()
    }

    fn lock_accounts(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredAccount>> {
        self.accounts.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn persist(&self) -> Result<()> {
        let Some(state) = &self.state else {
            return Ok(());
        };
        let mut accounts: Vec<StoredAccount> = self.lock_accounts().values().cloned().collect();
        accounts.sort_by(|a, b| a.user.email.cmp(&b.user.email));

        state.save(&ProviderSnapshot {
            user: self.notifier.current(),
            accounts,
            ..ProviderSnapshot::default()
        })
    }

    fn signed_in(&self, user: ProviderUser) -> Result<ProviderUser> {
        if self.notifier.current().as_ref() != Some(&user) {
            self.notifier.publish(Some(user.clone()));
        }
        self.persist()?;
        Ok(user)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::registration("the email address is badly formatted"))
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<ProviderUser> {
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::registration(format!(
                "password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let key = normalize_email(email);
        if self.lock_accounts().contains_key(&key) {
            return Err(Error::registration("the email address is already in use"));
        }
        let password_hash = hash_password(password)?;

        let user = {
            let mut accounts = self.lock_accounts();
            if accounts.contains_key(&key) {
                return Err(Error::registration("the email address is already in use"));
            }
            let user = ProviderUser::new(Uuid::new_v4().to_string(), email.trim());
            accounts.insert(
                key,
                StoredAccount {
                    user: user.clone(),
                    password_hash: Some(password_hash),
                },
            );
            user
        };

        self.signed_in(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser> {
        let account = self.lock_accounts().get(&normalize_email(email)).cloned();
        let user = match account {
            Some(StoredAccount {
                user,
                password_hash: Some(phc),
            }) if verify_password(password, &phc) => user,
            _ => return Err(Error::authentication("invalid email or password")),
        };
        self.signed_in(user)
    }

    async fn sign_in_with_popup(&self) -> Result<ProviderUser> {
        let popup = self.popup_account.lock().unwrap_or_else(|p| p.into_inner()).clone();
        let Some(user) = popup else {
            return Err(Error::authentication("the popup was closed before sign-in completed"));
        };

        let user = {
            let mut accounts = self.lock_accounts();
            let key = normalize_email(user.email.as_deref().unwrap_or(&user.uid));
            accounts
                .entry(key)
                .or_insert(StoredAccount {
                    user,
                    password_hash: None,
                })
                .user
                .clone()
        };
        self.signed_in(user)
    }

    async fn sign_out(&self) -> Result<()> {
        if self.notifier.current().is_some() {
            self.notifier.publish(None);
        }
        self.persist()
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<ProviderUser> {
        let Some(mut user) = self.notifier.current() else {
            return Err(Error::NotAuthenticated);
        };
        update.apply_to(&mut user);

        if let Some(email) = &user.email {
            if let Some(account) = self.lock_accounts().get_mut(&normalize_email(email)) {
                account.user = user.clone();
            }
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
