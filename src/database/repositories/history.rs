use std::sync::Arc;

use tracing::debug;

use crate::database::manager::StoreHandle;
use crate::database::models::HistoryEntry;
use crate::database::record::Stored;
use crate::database::repository::{RepositoryError, TenantRepository};
use crate::database::search::{RecordSearch, ScanSearch};
use crate::database::store::{DocumentQuery, OrderField, SortDirection};

/// `users/{uid}/history`
#[derive(Clone)]
pub struct HistoryRepository {
    base: TenantRepository<HistoryEntry>,
    search: Arc<dyn RecordSearch<HistoryEntry>>,
}

impl HistoryRepository {
    pub fn new(handle: StoreHandle) -> Self {
        let base = TenantRepository::new(handle);
        let search = Arc::new(ScanSearch::new(base.clone()));
        Self { base, search }
    }

    pub async fn list(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Stored<HistoryEntry>>, RepositoryError> {
        self.base.list(user_id, limit, offset).await
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<Stored<HistoryEntry>>, RepositoryError> {
        self.base.get(user_id, id).await
    }

    pub async fn add_entry(
        &self,
        user_id: &str,
        original_prompt: &str,
        enhanced_prompt: &str,
    ) -> Result<Stored<HistoryEntry>, RepositoryError> {
        let entry = HistoryEntry::new(original_prompt, enhanced_prompt);
        let stored = self.base.create(user_id, &entry).await?;
        debug!("Added history entry {} for user {}", stored.id, user_id);
        Ok(stored)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
        self.base.delete(user_id, id).await
    }

    pub async fn clear(&self, user_id: &str) -> Result<usize, RepositoryError> {
        self.base.delete_all(user_id).await
    }

    /// Most recent entries by `timestamp`, independent of any paging offset.
    pub async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<Stored<HistoryEntry>>, RepositoryError> {
        let query = DocumentQuery::new()
            .order_by(OrderField::Data("timestamp".to_string()), SortDirection::Desc)
            .limit(limit);
        self.base.find(user_id, &query).await
    }

    /// Case-insensitive match on the original or enhanced prompt.
    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Stored<HistoryEntry>>, RepositoryError> {
        self.search.search(user_id, query, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recent_and_search() {
        let repo = HistoryRepository::new(StoreHandle::memory());
        for i in 0..5 {
            repo.add_entry("u1", &format!("prompt {}", i), &format!("Prompt {}. Be clear.", i))
                .await
                .unwrap();
        }
        repo.add_entry("u2", "prompt x", "y").await.unwrap();

        let recent = repo.recent("u1", 3).await.unwrap();
        let originals: Vec<_> = recent.iter().map(|e| e.record.original_prompt.as_str()).collect();
        assert_eq!(originals, vec!["prompt 4", "prompt 3", "prompt 2"]);

        let hits = repo.search("u1", "PROMPT 1", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(repo.search("u1", "be clear", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn clear_removes_everything_for_the_owner() {
        let repo = HistoryRepository::new(StoreHandle::memory());
        repo.add_entry("u1", "a", "b").await.unwrap();
        repo.add_entry("u1", "c", "d").await.unwrap();
        assert_eq!(repo.clear("u1").await.unwrap(), 2);
        assert!(repo.list("u1", 20, 0).await.unwrap().is_empty());
    }
}
