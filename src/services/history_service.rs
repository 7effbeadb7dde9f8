use tracing::{debug, info};

use super::cached;
use crate::cache::{CacheKey, ResponseCache};
use crate::database::models::HistoryEntry;
use crate::database::record::{Record, Stored};
use crate::database::repositories::HistoryRepository;
use crate::database::{RepositoryError, StoreHandle};

#[derive(Clone)]
pub struct HistoryService {
    repo: HistoryRepository,
    cache: ResponseCache,
}

impl HistoryService {
    pub fn new(handle: StoreHandle, cache: ResponseCache) -> Self {
        Self {
            repo: HistoryRepository::new(handle),
            cache,
        }
    }

    fn key(user_id: &str, operation: &str) -> CacheKey {
        CacheKey::new(HistoryEntry::COLLECTION, user_id, operation)
    }

    fn invalidate(&self, user_id: &str) {
        let n = self.cache.invalidate_tenant(HistoryEntry::COLLECTION, user_id);
        debug!("Invalidated {} cached history responses for user {}", n, user_id);
    }

    pub async fn list(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Stored<HistoryEntry>>, RepositoryError> {
        let key = Self::key(user_id, "list").with_param(limit).with_param(offset);
        cached(&self.cache, key, || self.repo.list(user_id, limit, offset)).await
    }

    pub async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<Stored<HistoryEntry>>, RepositoryError> {
        let key = Self::key(user_id, "recent").with_param(limit);
        cached(&self.cache, key, || self.repo.recent(user_id, limit)).await
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<Stored<HistoryEntry>>, RepositoryError> {
        let key = Self::key(user_id, "get").with_param(id);
        cached(&self.cache, key, || self.repo.get(user_id, id)).await
    }

    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Stored<HistoryEntry>>, RepositoryError> {
        let key = Self::key(user_id, "search").with_param(query.to_lowercase()).with_param(limit);
        cached(&self.cache, key, || self.repo.search(user_id, query, limit)).await
    }

    pub async fn add_entry(
        &self,
        user_id: &str,
        original_prompt: &str,
        enhanced_prompt: &str,
    ) -> Result<Stored<HistoryEntry>, RepositoryError> {
        let stored = self.repo.add_entry(user_id, original_prompt, enhanced_prompt).await?;
        self.invalidate(user_id);
        Ok(stored)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
        let deleted = self.repo.delete(user_id, id).await?;
        if deleted {
            self.invalidate(user_id);
            info!("Deleted history entry {} for user {}", id, user_id);
        }
        Ok(deleted)
    }

    pub async fn clear(&self, user_id: &str) -> Result<usize, RepositoryError> {
        let result = self.repo.clear(user_id).await;
        // Some documents may be gone even when others failed.
        self.invalidate(user_id);
        let deleted = result?;
        info!("Cleared {} history entries for user {}", deleted, user_id);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cached_recent_sees_new_entries() {
        let svc = HistoryService::new(StoreHandle::memory(), ResponseCache::new(Duration::from_secs(60), 100));
        svc.add_entry("u1", "a", "A.").await.unwrap();
        assert_eq!(svc.recent("u1", 10).await.unwrap().len(), 1);

        svc.add_entry("u1", "b", "B.").await.unwrap();
        let recent = svc.recent("u1", 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].record.original_prompt, "b");

        svc.clear("u1").await.unwrap();
        assert!(svc.recent("u1", 10).await.unwrap().is_empty());
    }
}
