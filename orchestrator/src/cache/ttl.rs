//! Expiring key/value cache

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Cache entry with its expiry
#[derive(Debug, Clone)]
struct TtlEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> TtlEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe in-memory cache where entries expire after a TTL.
///
/// There is no capacity bound; expired entries are dropped on read.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, TtlEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Create a new cache whose entries live for `default_ttl`
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Get a live value
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it so the map does not keep growing
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        None
    }

    /// Insert a value with the default TTL
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert a value with a specific TTL
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.into(),
            TtlEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Remove a value
    pub fn remove(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).map(|e| e.value)
    }

    /// Remove every key starting with `prefix`
    pub fn remove_prefix(&self, prefix: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|key, _| !key.starts_with(prefix));
    }

    /// Number of stored entries, expired ones included until read
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
