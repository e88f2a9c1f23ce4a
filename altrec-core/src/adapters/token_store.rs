//! Token store adapters
//!
//! - `FileTokenStore` persists the token in `session.json` so it survives
//!   restarts
//! - `MemoryTokenStore` keeps it for the life of the process (tests, demos)

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::domain::result::Result;
use crate::domain::AccessToken;
use crate::ports::TokenStore;

/// File name of the durable session store inside the data directory
pub const SESSION_FILE: &str = "session.json";

/// Raw session.json structure
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, JsonValue>,
}

/// Token store backed by a JSON file
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes read-modify-write of the file within this process
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Store using `session.json` inside `data_dir`
    pub fn new(data_dir: &Path) -> Self {
        Self::at_path(data_dir.join(SESSION_FILE))
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file contents; `None` when the file exists but is not a
    /// session document
    fn read(&self) -> Result<Option<SessionFile>> {
        if !self.path.exists() {
            return Ok(Some(SessionFile::default()));
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Some(SessionFile::default()));
        }
        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable session file, treating as signed out");
                Ok(None)
            }
        }
    }

    fn write(&self, session: &SessionFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AccessToken>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        Ok(self
            .read()?
            .and_then(|session| session.access_token)
            .map(AccessToken::new))
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        // A corrupt file is replaced wholesale
        let mut session = self.read()?.unwrap_or_default();
        session.access_token = Some(token.as_str().to_string());
        self.write(&session)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        if !self.path.exists() {
            return Ok(());
        }
        match self.read()? {
            Some(mut session) => {
                if session.access_token.take().is_none() {
                    return Ok(());
                }
                self.write(&session)
            }
            None => {
                std::fs::remove_file(&self.path)?;
                Ok(())
            }
        }
    }
}

/// Token store held in memory
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<AccessToken>> {
        Ok(self.token.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        *self.token.lock().unwrap_or_else(|p| p.into_inner()) = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().unwrap_or_else(|p| p.into_inner()) = None;
        Ok(())
    }
}
