//! Durable provider session state
//!
//! Hosted providers keep their session between runs of a browser app; a
//! terminal process has to do the same by hand. `ProviderStateFile` stores
//! the signed-in provider user (and, for the local provider, its accounts)
//! in `provider.json` inside the data directory.

use std::path::{Path, PathBuf};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::ProviderUser;

pub const PROVIDER_FILE: &str = "provider.json";

/// Argon2id cost for local demo accounts (memory KiB, iterations, lanes)
const HASH_MEMORY_KIB: u32 = 8 * 1024;
const HASH_ITERATIONS: u32 = 1;
const HASH_LANES: u32 = 1;

/// An account of the local provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAccount {
    pub user: ProviderUser,
    /// PHC string; `None` for accounts created through the popup flow
    #[serde(default)]
    pub password_hash: Option<String>,
}

/// Everything a provider needs to pick up where the last run stopped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSnapshot {
    #[serde(default)]
    pub user: Option<ProviderUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<StoredAccount>,
}

#[derive(Debug, Clone)]
pub struct ProviderStateFile {
    path: PathBuf,
}

impl ProviderStateFile {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(PROVIDER_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<ProviderSnapshot> {
        if !self.path.exists() {
            return Ok(ProviderSnapshot::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ProviderSnapshot::default());
        }
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid {}: {}", self.path.display(), e)))
    }

    pub fn save(&self, snapshot: &ProviderSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(snapshot)?)?;
        Ok(())
    }
}

fn hasher() -> Result<Argon2<'static>> {
    let params = Params::new(HASH_MEMORY_KIB, HASH_ITERATIONS, HASH_LANES, None)
        .map_err(|e| Error::Config(format!("invalid password hash parameters: {}", e)))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| Error::Config(format!("failed to encode salt: {}", e)))?;

    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Config(format!("failed to hash password: {}", e)))
}

/// Check a password against a PHC string; malformed hashes never match
pub fn verify_password(password: &str, phc: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(phc) else {
        return false;
    };
    match hasher() {
        Ok(argon2) => argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}
