//! In-process, per-entry-TTL cache.
//!
//! The gauge endpoint caches its computed result for 60 seconds and the AI
//! endpoint for 300 seconds; both are small, single-key-space caches with no
//! durability requirement, so a `DashMap<String, CacheEntry<T>>` with an
//! expiry timestamp per entry is the whole implementation — no eviction
//! thread, entries are checked lazily on read.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

/// A `SimpleCache<T>` shared across request handlers via `AppState`. Cloning
/// is cheap (`Arc` around the map).
#[derive(Clone)]
pub struct SimpleCache<T: Clone + Send + Sync + 'static> {
    entries: Arc<DashMap<String, CacheEntry<T>>>,
    ttl: Duration,
}

impl<T: Clone + Send + Sync + 'static> SimpleCache<T> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Returns the cached value for `key` if present and not yet expired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    /// Inserts `value` for `key`, resetting the TTL from now.
    pub fn put(&self, key: impl Into<String>, value: T) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Removes every expired entry. Not required for correctness (`get`
    /// lazily evicts), but keeps long-lived deployments from accumulating
    /// stale keys under unbounded key spaces.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_returns_value() {
        let cache: SimpleCache<u32> = SimpleCache::new(Duration::from_secs(60));
        cache.put("womens-sports", 42);
        assert_eq!(cache.get("womens-sports"), Some(42));
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache: SimpleCache<u32> = SimpleCache::new(Duration::from_millis(0));
        cache.put("k", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn sweep_expired_removes_stale_entries() {
        let cache: SimpleCache<u32> = SimpleCache::new(Duration::from_millis(0));
        cache.put("k", 1);
        std::thread::sleep(Duration::from_millis(5));
        cache.sweep_expired();
        assert!(cache.is_empty());
    }
}
