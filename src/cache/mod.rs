//! Process-local TTL caches.
//!
//! [`TtlCache`] backs both the token verification cache and the response
//! cache. Entries expire after a fixed TTL, the map is bounded by
//! `max_entries`, and an optional background sweeper purges expired entries so
//! memory does not grow with token churn.

pub mod response;

pub use response::{CacheKey, ResponseCache};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < self.ttl
    }
}

#[derive(Debug)]
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, ttl: Duration, max_entries: usize) -> Self {
        Self {
            name,
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Lookup as of `now`. A hit requires `now - inserted_at` to be below the
    /// entry's TTL; expired entries are dropped on read.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                debug!(cache = self.name, "cache hit for key: {}", key);
                Some(entry.data.clone())
            }
            Some(_) => {
                debug!(cache = self.name, "cache expired for key: {}", key);
                entries.remove(key);
                None
            }
            None => {
                debug!(cache = self.name, "cache miss for key: {}", key);
                None
            }
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&self, key: impl Into<String>, value: V, now: Instant) {
        self.insert_with_ttl_at(key, value, self.ttl, now);
    }

    /// Inserts with a lifetime of `ttl`, never longer than the cache TTL.
    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.insert_with_ttl_at(key, value, ttl, Instant::now());
    }

    pub fn insert_with_ttl_at(&self, key: impl Into<String>, value: V, ttl: Duration, now: Instant) {
        let key = key.into();
        let ttl = ttl.min(self.ttl);
        let mut entries = self.lock();

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| entry.is_live(now));

            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    debug!(cache = self.name, "evicting oldest entry: {}", oldest);
                    entries.remove(&oldest);
                }
            }
        }

        debug!(cache = self.name, "cache set for key: {}", key);
        entries.insert(
            key,
            CacheEntry {
                data: value,
                inserted_at: now,
                ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drops every entry whose key starts with `prefix`; returns how many went.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(cache = self.name, "invalidated {} entries with prefix: {}", removed, prefix);
        }
        removed
    }

    pub fn remove_expired(&self) -> usize {
        self.remove_expired_at(Instant::now())
    }

    pub fn remove_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(cache = self.name, "removed {} expired cache entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // A panic while holding the guard leaves the map itself consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone + Send + 'static> TtlCache<V> {
    /// Periodically purges expired entries until the cache is dropped
    /// everywhere else.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(cache) => {
                        cache.remove_expired();
                    }
                    None => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl_secs: u64, max: usize) -> TtlCache<String> {
        TtlCache::new("test", Duration::from_secs(ttl_secs), max)
    }

    #[test]
    fn entry_is_served_until_ttl_elapses() {
        let cache = cache(10, 16);
        let t0 = Instant::now();
        cache.insert_at("k", "v".to_string(), t0);

        assert_eq!(cache.get_at("k", t0), Some("v".to_string()));
        assert_eq!(cache.get_at("k", t0 + Duration::from_millis(9_999)), Some("v".to_string()));
        assert_eq!(cache.get_at("k", t0 + Duration::from_secs(10)), None);
        // expired entry was dropped on read
        assert!(cache.is_empty());
    }

    #[test]
    fn entry_ttl_is_capped_by_cache_ttl() {
        let cache = cache(10, 16);
        let t0 = Instant::now();
        cache.insert_with_ttl_at("short", "s".to_string(), Duration::from_secs(2), t0);
        cache.insert_with_ttl_at("long", "l".to_string(), Duration::from_secs(60), t0);

        let later = t0 + Duration::from_secs(3);
        assert_eq!(cache.get_at("short", later), None);
        assert_eq!(cache.get_at("long", later), Some("l".to_string()));
        assert_eq!(cache.get_at("long", t0 + Duration::from_secs(10)), None);
    }

    #[test]
    fn prefix_invalidation_leaves_other_keys() {
        let cache = cache(60, 16);
        cache.insert("prompts:u1:list", "a".to_string());
        cache.insert("prompts:u1:get:p1", "b".to_string());
        cache.insert("prompts:u2:list", "c".to_string());

        assert_eq!(cache.invalidate_prefix("prompts:u1:"), 2);
        assert!(cache.get("prompts:u1:list").is_none());
        assert_eq!(cache.get("prompts:u2:list"), Some("c".to_string()));
    }

    #[test]
    fn bounded_cache_evicts_oldest() {
        let cache = cache(60, 2);
        let t0 = Instant::now();
        cache.insert_at("a", "1".to_string(), t0);
        cache.insert_at("b", "2".to_string(), t0 + Duration::from_secs(1));
        cache.insert_at("c", "3".to_string(), t0 + Duration::from_secs(2));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("a", t0 + Duration::from_secs(3)).is_none());
        assert_eq!(cache.get_at("c", t0 + Duration::from_secs(3)), Some("3".to_string()));
    }

    #[test]
    fn overflow_prefers_dropping_expired_entries() {
        let cache = cache(5, 2);
        let t0 = Instant::now();
        cache.insert_at("old", "1".to_string(), t0);
        cache.insert_at("fresh", "2".to_string(), t0 + Duration::from_secs(4));
        cache.insert_at("new", "3".to_string(), t0 + Duration::from_secs(6));

        let now = t0 + Duration::from_secs(6);
        assert_eq!(cache.get_at("fresh", now), Some("2".to_string()));
        assert_eq!(cache.get_at("new", now), Some("3".to_string()));
    }

    #[test]
    fn sweep_removes_only_expired() {
        let cache = cache(5, 16);
        let t0 = Instant::now();
        cache.insert_at("a", "1".to_string(), t0);
        cache.insert_at("b", "2".to_string(), t0 + Duration::from_secs(3));

        assert_eq!(cache.remove_expired_at(t0 + Duration::from_secs(6)), 1);
        assert_eq!(cache.len(), 1);
    }
}
