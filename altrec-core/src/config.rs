//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "apiBaseUrl": "https://api.example.com",
//!   "requestTimeoutSecs": 10,
//!   "identityProvider": "firebase",
//!   "firebaseApiKey": "...",
//!   "defaultPhotoUrl": "https://i.ibb.co/M6tBqSs/profile.png"
//! }
//! ```
//! Keys this crate does not manage are kept as-is when saving.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PHOTO_URL: &str = "https://i.ibb.co/M6tBqSs/profile.png";

pub const ENV_API_BASE_URL: &str = "ALTREC_API_BASE_URL";
pub const ENV_IDENTITY_PROVIDER: &str = "ALTREC_IDENTITY_PROVIDER";
pub const ENV_FIREBASE_API_KEY: &str = "ALTREC_FIREBASE_API_KEY";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity_provider: Option<IdentityProviderKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    firebase_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_photo_url: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Which identity provider backs the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProviderKind {
    Firebase,
    #[default]
    Local,
}

impl FromStr for IdentityProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "firebase" => Ok(Self::Firebase),
            "local" => Ok(Self::Local),
            other => Err(Error::Config(format!(
                "unknown identity provider '{}' (expected firebase or local)",
                other
            ))),
        }
    }
}

impl fmt::Display for IdentityProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Firebase => f.write_str("firebase"),
            Self::Local => f.write_str("local"),
        }
    }
}

/// Altrec configuration (resolved view of settings plus environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub identity_provider: IdentityProviderKind,
    pub firebase_api_key: Option<String>,
    pub default_photo_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            identity_provider: IdentityProviderKind::default(),
            firebase_api_key: None,
            default_photo_url: DEFAULT_PHOTO_URL.to_string(),
        }
    }
}

impl Config {
    /// Load config from the data directory, applying environment overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    /// Load config using `env` to look up overrides
    pub fn load_with_env<F>(data_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = read_settings(&data_dir.join(SETTINGS_FILE))?;
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let identity_provider = match lookup(ENV_IDENTITY_PROVIDER) {
            Some(value) => value.parse()?,
            None => raw.identity_provider.unwrap_or_default(),
        };

        let timeout_secs = raw.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config("requestTimeoutSecs must be greater than 0".to_string()));
        }

        Ok(Self {
            api_base_url: lookup(ENV_API_BASE_URL)
                .or(raw.api_base_url)
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
            identity_provider,
            firebase_api_key: lookup(ENV_FIREBASE_API_KEY).or(raw.firebase_api_key),
            default_photo_url: raw
                .default_photo_url
                .unwrap_or_else(|| DEFAULT_PHOTO_URL.to_string()),
        })
    }

    /// Save config to the data directory
    /// Preserves other settings this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);
        let mut settings = read_settings(&settings_path)?;

        settings.api_base_url = Some(self.api_base_url.clone());
        settings.request_timeout_secs = Some(self.request_timeout.as_secs());
        settings.identity_provider = Some(self.identity_provider);
        settings.firebase_api_key = self.firebase_api_key.clone();
        settings.default_photo_url = Some(self.default_photo_url.clone());

        std::fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_with_env(dir.path(), no_env).unwrap();

        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.identity_provider, IdentityProviderKind::Local);
        assert_eq!(config.default_photo_url, DEFAULT_PHOTO_URL);
    }

    #[test]
    fn test_settings_file_values() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"apiBaseUrl":"https://api.example.com","identityProvider":"firebase","firebaseApiKey":"k1","requestTimeoutSecs":3}"#,
        )
        .unwrap();

        let config = Config::load_with_env(dir.path(), no_env).unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.identity_provider, IdentityProviderKind::Firebase);
        assert_eq!(config.firebase_api_key.as_deref(), Some("k1"));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_env_overrides_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), r#"{"apiBaseUrl":"https://file"}"#).unwrap();

        let config = Config::load_with_env(dir.path(), |key| match key {
            ENV_API_BASE_URL => Some("https://env".to_string()),
            ENV_IDENTITY_PROVIDER => Some("Firebase".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.api_base_url, "https://env");
        assert_eq!(config.identity_provider, IdentityProviderKind::Firebase);
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_with_env(dir.path(), |key| {
            (key == ENV_IDENTITY_PROVIDER).then(|| "okta".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_settings_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();

        let err = Config::load_with_env(dir.path(), no_env).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"theme":"dark","apiBaseUrl":"https://old"}"#).unwrap();

        let mut config = Config::load_with_env(dir.path(), no_env).unwrap();
        config.api_base_url = "https://new".to_string();
        config.save(dir.path()).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw["apiBaseUrl"], "https://new");
        assert_eq!(raw["identityProvider"], "local");
    }
}
