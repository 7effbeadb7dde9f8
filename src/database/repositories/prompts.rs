use std::sync::Arc;

use tracing::debug;

use crate::database::manager::StoreHandle;
use crate::database::models::Prompt;
use crate::database::record::Stored;
use crate::database::repository::{RepositoryError, TenantRepository};
use crate::database::search::{RecordSearch, ScanSearch};
use crate::database::store::DocumentQuery;

/// `users/{uid}/prompts`
#[derive(Clone)]
pub struct PromptRepository {
    base: TenantRepository<Prompt>,
    search: Arc<dyn RecordSearch<Prompt>>,
}

impl PromptRepository {
    pub fn new(handle: StoreHandle) -> Self {
        let base = TenantRepository::new(handle);
        let search = Arc::new(ScanSearch::new(base.clone()));
        Self { base, search }
    }

    pub async fn list(&self, user_id: &str, limit: usize, offset: usize) -> Result<Vec<Stored<Prompt>>, RepositoryError> {
        self.base.list(user_id, limit, offset).await
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<Stored<Prompt>>, RepositoryError> {
        self.base.get(user_id, id).await
    }

    pub async fn get_existing(&self, user_id: &str, id: &str) -> Result<Stored<Prompt>, RepositoryError> {
        self.base.get_existing(user_id, id).await
    }

    pub async fn create(&self, user_id: &str, prompt: &Prompt) -> Result<Stored<Prompt>, RepositoryError> {
        self.base.create(user_id, prompt).await
    }

    pub async fn update(&self, user_id: &str, id: &str, prompt: &Prompt) -> Result<Stored<Prompt>, RepositoryError> {
        self.base.update(user_id, id, prompt).await
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
        self.base.delete(user_id, id).await
    }

    pub async fn find_by_name(&self, user_id: &str, name: &str) -> Result<Option<Stored<Prompt>>, RepositoryError> {
        let query = DocumentQuery::new().where_eq("prompt_name", name).limit(1);
        let found = self.base.find(user_id, &query).await?.into_iter().next();
        if found.is_none() {
            debug!("Prompt with name '{}' not found for user {}", name, user_id);
        }
        Ok(found)
    }

    /// Case-insensitive match on name or description.
    pub async fn search(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<Stored<Prompt>>, RepositoryError> {
        self.search.search(user_id, query, limit).await
    }
}
