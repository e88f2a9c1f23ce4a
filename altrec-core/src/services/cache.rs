//! Response cache - time-expiring memo of successful reads
//!
//! Entries live for a fixed [`CACHE_TTL`] from insertion. Expiry is checked
//! when an entry is read; nothing sweeps the map in the background, and an
//! entry only goes away when a fresh write for the same key replaces it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::time::Instant;
use url::form_urlencoded;

/// Validity window of every cache entry
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Key prefix for entries written by the public client
const PUBLIC_PREFIX: &str = "public_";

/// Which client a cached read belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheScope {
    Authenticated,
    Public,
}

/// A memoized successful read
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: JsonValue,
    pub inserted_at: Instant,
}

impl CacheEntry {
    fn is_fresh_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < CACHE_TTL
    }
}

/// Shared read-through cache used by both API clients
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the key for a read: scope prefix, path, then the serialized
    /// query parameters in caller order
    pub fn key(scope: CacheScope, path: &str, params: &[(&str, &str)]) -> String {
        let mut key = String::new();
        if scope == CacheScope::Public {
            key.push_str(PUBLIC_PREFIX);
        }
        key.push_str(path);

        if !params.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            key.push('?');
            key.push_str(&encoded);
        }
        key
    }

    /// Payload stored under `key` if it has not expired
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.get_at(key, Instant::now())
    }

    /// Store a payload under `key`, replacing any previous entry
    pub fn insert(&self, key: impl Into<String>, payload: JsonValue) {
        self.insert_at(key, payload, Instant::now());
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<JsonValue> {
        let entries = self.lock();
        entries
            .get(key)
            .filter(|entry| entry.is_fresh_at(now))
            .map(|entry| entry.payload.clone())
    }

    pub(crate) fn insert_at(&self, key: impl Into<String>, payload: JsonValue, now: Instant) {
        self.lock().insert(
            key.into(),
            CacheEntry {
                payload,
                inserted_at: now,
            },
        );
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
