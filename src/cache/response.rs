use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::TtlCache;

/// Structural response cache key.
///
/// Renders as `{collection}:{user_id}:{operation}[:{param}...]`, with each
/// component escaped so one tenant's key can never be a prefix of, or equal
/// to, another tenant's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    collection: String,
    user_id: String,
    operation: String,
    params: Vec<String>,
}

impl CacheKey {
    fn prefix(&self) -> String {
        Self::tenant_prefix(&self.collection, &self.user_id)
    }

    pub fn new(collection: &str, user_id: &str, operation: &str) -> Self {
        Self {
            collection: collection.to_string(),
            user_id: user_id.to_string(),
            operation: operation.to_string(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: impl fmt::Display) -> Self {
        self.params.push(param.to_string());
        self
    }

    /// Prefix shared by every key of one tenant within one collection.
    pub fn tenant_prefix(collection: &str, user_id: &str) -> String {
        format!("{}:{}:", escape(collection), escape(user_id))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.prefix(),
            escape(&self.operation)
        )?;
        for param in &self.params {
            write!(f, ":{}", escape(param))?;
        }
        Ok(())
    }
}

fn escape(component: &str) -> String {
    component.replace('%', "%25").replace(':', "%3A")
}

/// Short-TTL memoisation of serialisable responses, keyed by [`CacheKey`].
///
/// Each tenant prefix carries a generation that [`invalidate_tenant`]
/// bumps. A load started before an invalidation stores its result with
/// [`set_if_current`] and is dropped if the generation moved meanwhile.
///
/// [`invalidate_tenant`]: ResponseCache::invalidate_tenant
/// [`set_if_current`]: ResponseCache::set_if_current
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Arc<TtlCache<serde_json::Value>>,
    generations: Arc<Mutex<HashMap<String, u64>>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Arc::new(TtlCache::new("response", ttl, max_entries)),
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn generations(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.generations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current generation of the tenant prefix `key` belongs to.
    pub fn generation(&self, key: &CacheKey) -> u64 {
        self.generations().get(&key.prefix()).copied().unwrap_or(0)
    }

    /// Caches `data` only if no invalidation of the key's tenant prefix
    /// happened since `generation` was read. Returns whether it was stored.
    pub fn set_if_current<T: Serialize>(&self, key: &CacheKey, data: &T, generation: u64) -> bool {
        // Held across the insert so a concurrent bump either precedes the
        // check or is followed by its own prefix invalidation.
        let generations = self.generations();
        if generations.get(&key.prefix()).copied().unwrap_or(0) != generation {
            debug!("not caching {}: invalidated while loading", key);
            return false;
        }
        self.set(key, data);
        true
    }

    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let key = key.to_string();
        let value = self.inner.get(&key)?;
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("discarding undecodable cache entry {}: {}", key, e);
                self.inner.invalidate(&key);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &CacheKey, data: &T) {
        match serde_json::to_value(data) {
            Ok(value) => self.inner.insert(key.to_string(), value),
            Err(e) => warn!("not caching {}: {}", key, e),
        }
    }

    pub fn invalidate(&self, prefix: &str) -> usize {
        self.inner.invalidate_prefix(prefix)
    }

    /// Drops every cached response of `user_id` in `collection`. Called by
    /// each write path right after the write succeeds.
    pub fn invalidate_tenant(&self, collection: &str, user_id: &str) -> usize {
        let prefix = CacheKey::tenant_prefix(collection, user_id);
        {
            let mut generations = self.generations();
            let generation = generations.entry(prefix.clone()).or_insert(0);
            *generation = generation.wrapping_add(1);
        }
        self.invalidate(&prefix)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        self.inner.spawn_sweeper(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_renders_structurally() {
        let key = CacheKey::new("prompts", "u1", "list").with_param(10).with_param(0);
        assert_eq!(key.to_string(), "prompts:u1:list:10:0");
        assert!(key.to_string().starts_with(&CacheKey::tenant_prefix("prompts", "u1")));
    }

    #[test]
    fn tenant_ids_with_separators_do_not_collide() {
        let a = CacheKey::new("prompts", "a", "b").with_param("list");
        let b = CacheKey::new("prompts", "a:b", "list");
        assert_ne!(a.to_string(), b.to_string());
        assert!(!b.to_string().starts_with(&CacheKey::tenant_prefix("prompts", "a")));
    }

    #[test]
    fn typed_round_trip_and_tenant_invalidation() {
        let cache = ResponseCache::new(Duration::from_secs(60), 100);
        let mine = CacheKey::new("history", "u1", "recent").with_param(5);
        let theirs = CacheKey::new("history", "u2", "recent").with_param(5);
        cache.set(&mine, &vec!["a".to_string()]);
        cache.set(&theirs, &vec!["b".to_string()]);

        let hit: Option<Vec<String>> = cache.get(&mine);
        assert_eq!(hit, Some(vec!["a".to_string()]));

        assert_eq!(cache.invalidate_tenant("history", "u1"), 1);
        assert!(cache.get::<Vec<String>>(&mine).is_none());
        assert!(cache.get::<Vec<String>>(&theirs).is_some());
    }

    #[test]
    fn load_started_before_invalidation_is_not_cached() {
        let cache = ResponseCache::new(Duration::from_secs(60), 100);
        let key = CacheKey::new("prompts", "u1", "list");
        let other = CacheKey::new("prompts", "u2", "list");

        let generation = cache.generation(&key);
        let other_generation = cache.generation(&other);
        cache.invalidate_tenant("prompts", "u1");

        assert!(!cache.set_if_current(&key, &vec![1], generation));
        assert!(cache.get::<Vec<i32>>(&key).is_none());

        // other tenants are unaffected
        assert!(cache.set_if_current(&other, &vec![2], other_generation));
        assert_eq!(cache.get::<Vec<i32>>(&other), Some(vec![2]));

        let fresh = cache.generation(&key);
        assert!(cache.set_if_current(&key, &vec![3], fresh));
        assert_eq!(cache.get::<Vec<i32>>(&key), Some(vec![3]));
    }
}
