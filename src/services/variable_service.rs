use tracing::{debug, info};

use super::cached;
use crate::cache::{CacheKey, ResponseCache};
use crate::database::models::Variable;
use crate::database::record::{Record, Stored};
use crate::database::repositories::VariableRepository;
use crate::database::{RepositoryError, StoreHandle};

#[derive(Clone)]
pub struct VariableService {
    repo: VariableRepository,
    cache: ResponseCache,
}

impl VariableService {
    pub fn new(handle: StoreHandle, cache: ResponseCache) -> Self {
        Self {
            repo: VariableRepository::new(handle),
            cache,
        }
    }

    fn key(user_id: &str, operation: &str) -> CacheKey {
        CacheKey::new(Variable::COLLECTION, user_id, operation)
    }

    fn invalidate(&self, user_id: &str) {
        let n = self.cache.invalidate_tenant(Variable::COLLECTION, user_id);
        debug!("Invalidated {} cached variable responses for user {}", n, user_id);
    }

    pub async fn list(&self, user_id: &str, limit: usize, offset: usize) -> Result<Vec<Stored<Variable>>, RepositoryError> {
        let key = Self::key(user_id, "list").with_param(limit).with_param(offset);
        cached(&self.cache, key, || self.repo.list(user_id, limit, offset)).await
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<Stored<Variable>>, RepositoryError> {
        let key = Self::key(user_id, "get").with_param(id);
        cached(&self.cache, key, || self.repo.get(user_id, id)).await
    }

    pub async fn create(&self, user_id: &str, variable: Variable) -> Result<Stored<Variable>, RepositoryError> {
        let stored = self.repo.create(user_id, &variable).await?;
        self.invalidate(user_id);
        info!("Created variable {} for user {}", stored.id, user_id);
        Ok(stored)
    }

    pub async fn update(&self, user_id: &str, id: &str, variable: Variable) -> Result<Stored<Variable>, RepositoryError> {
        let stored = self.repo.update(user_id, id, &variable).await?;
        self.invalidate(user_id);
        Ok(stored)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
        let deleted = self.repo.delete(user_id, id).await?;
        if deleted {
            self.invalidate(user_id);
        }
        Ok(deleted)
    }
}
