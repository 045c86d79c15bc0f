//! Thread-safe key/value cache with a store-wide expiration.
//!
//! One expiration duration is in effect at a time. It is captured as an
//! absolute deadline when a value is added, so changing it never shortens or
//! extends entries that are already stored. Expired entries read as absent and
//! are dropped lazily on access or eagerly through [`MemoryCache::purge_expired`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::trace;

pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(60 * 60);

/// Storage used by the quoter for per-instrument order lists.
///
/// Implementations must be safe to call from many threads at once without
/// any locking on the caller's side.
pub trait Cache<V>: Send + Sync {
    /// Returns a copy of the value, or `None` when the key is absent or expired.
    fn get(&self, key: &str) -> Option<V>;
    fn contains(&self, key: &str) -> bool;
    /// Inserts or overwrites `key`, stamping it with the current expiration.
    fn add(&self, key: &str, value: V);
    fn remove(&self, key: &str);
    fn set_expiration_time(&self, expiration: Duration);
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    // None when the deadline does not fit in an Instant
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    expiration: RwLock<Duration>,
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self::with_expiration(DEFAULT_EXPIRATION)
    }

    pub fn with_expiration(expiration: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            expiration: RwLock::new(expiration),
        }
    }

    pub fn expiration_time(&self) -> Duration {
        *self.expiration.read()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - entries.len();
        trace!(purged, "Purged expired cache entries");
        purged
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_if_expired(&self, key: &str, now: Instant) {
        let mut entries = self.entries.write();
        // Re-check under the write lock; a fresh add may have replaced it
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            trace!(key, "Evicted expired cache entry");
        }
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> Cache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }
        self.evict_if_expired(key, now);
        None
    }

    fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    fn add(&self, key: &str, value: V) {
        let expires_at = Instant::now().checked_add(self.expiration_time());
        self.entries
            .write()
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn set_expiration_time(&self, expiration: Duration) {
        *self.expiration.write() = expiration;
    }
}
