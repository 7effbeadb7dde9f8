use tracing::{debug, info};

use super::cached;
use crate::cache::{CacheKey, ResponseCache};
use crate::database::models::{NewPrompt, Prompt, PromptPatch};
use crate::database::record::{Record, Stored};
use crate::database::repositories::PromptRepository;
use crate::database::{RepositoryError, StoreHandle};

#[derive(Clone)]
pub struct PromptService {
    repo: PromptRepository,
    cache: ResponseCache,
}

impl PromptService {
    pub fn new(handle: StoreHandle, cache: ResponseCache) -> Self {
        Self {
            repo: PromptRepository::new(handle),
            cache,
        }
    }

    fn key(user_id: &str, operation: &str) -> CacheKey {
        CacheKey::new(Prompt::COLLECTION, user_id, operation)
    }

    fn invalidate(&self, user_id: &str) {
        let n = self.cache.invalidate_tenant(Prompt::COLLECTION, user_id);
        debug!("Invalidated {} cached prompt responses for user {}", n, user_id);
    }

    pub async fn list(&self, user_id: &str, limit: usize, offset: usize) -> Result<Vec<Stored<Prompt>>, RepositoryError> {
        let key = Self::key(user_id, "list").with_param(limit).with_param(offset);
        cached(&self.cache, key, || self.repo.list(user_id, limit, offset)).await
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<Stored<Prompt>>, RepositoryError> {
        let key = Self::key(user_id, "get").with_param(id);
        cached(&self.cache, key, || self.repo.get(user_id, id)).await
    }

    pub async fn find_by_name(&self, user_id: &str, name: &str) -> Result<Option<Stored<Prompt>>, RepositoryError> {
        let key = Self::key(user_id, "by_name").with_param(name);
        cached(&self.cache, key, || self.repo.find_by_name(user_id, name)).await
    }

    pub async fn search(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<Stored<Prompt>>, RepositoryError> {
        let key = Self::key(user_id, "search").with_param(query.to_lowercase()).with_param(limit);
        cached(&self.cache, key, || self.repo.search(user_id, query, limit)).await
    }

    /// Variables are derived from `prompt_text`.
    pub async fn create(&self, user_id: &str, input: NewPrompt) -> Result<Stored<Prompt>, RepositoryError> {
        let prompt = Prompt::from(input);
        let stored = self.repo.create(user_id, &prompt).await?;
        self.invalidate(user_id);
        info!("Created prompt {} for user {}", stored.id, user_id);
        Ok(stored)
    }

    /// Merges `patch` onto the current prompt and re-derives its variables.
    pub async fn update(&self, user_id: &str, id: &str, patch: PromptPatch) -> Result<Stored<Prompt>, RepositoryError> {
        let existing = self.repo.get_existing(user_id, id).await?;
        let merged = patch.apply(existing.record);
        let stored = self.repo.update(user_id, id, &merged).await?;
        self.invalidate(user_id);
        info!("Updated prompt {} for user {}", id, user_id);
        Ok(stored)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
        let deleted = self.repo.delete(user_id, id).await?;
        if deleted {
            self.invalidate(user_id);
            info!("Deleted prompt {} for user {}", id, user_id);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service() -> PromptService {
        PromptService::new(StoreHandle::memory(), ResponseCache::new(Duration::from_secs(60), 1000))
    }

    fn input(name: &str, text: &str) -> NewPrompt {
        NewPrompt {
            prompt_name: name.into(),
            prompt_text: text.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn writes_invalidate_cached_lists() {
        let svc = service();
        svc.create("u1", input("a", "x")).await.unwrap();
        assert_eq!(svc.list("u1", 10, 0).await.unwrap().len(), 1);

        svc.create("u1", input("b", "y")).await.unwrap();
        assert_eq!(svc.list("u1", 10, 0).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_rederives_variables_from_merged_text() {
        let svc = service();
        let created = svc.create("u1", input("greet", "Hi {{name}} and {{name}}")).await.unwrap();
        assert_eq!(created.record.variables.len(), 1);

        // cache the old version, then update
        svc.get("u1", &created.id).await.unwrap();
        let patch = PromptPatch {
            prompt_text: Some("{{ a }} {{b}}".into()),
            ..Default::default()
        };
        let updated = svc.update("u1", &created.id, patch).await.unwrap();
        assert_eq!(updated.record.prompt_name, "greet");
        assert_eq!(updated.record.variables.len(), 2);

        let fetched = svc.get("u1", &created.id).await.unwrap().unwrap();
        assert_eq!(fetched.record.prompt_text, "{{ a }} {{b}}");
    }

    #[tokio::test]
    async fn update_of_foreign_prompt_is_not_found() {
        let svc = service();
        let created = svc.create("u1", input("a", "x")).await.unwrap();
        let res = svc.update("u2", &created.id, PromptPatch::default()).await;
        assert!(matches!(res, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn update_without_store_is_unavailable() {
        let svc = PromptService::new(StoreHandle::degraded(), ResponseCache::new(Duration::from_secs(60), 10));
        let res = svc.update("u1", "p1", PromptPatch::default()).await;
        assert!(matches!(res, Err(RepositoryError::StoreUnavailable)));
    }
}
