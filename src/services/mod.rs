pub mod enhance_service;
pub mod history_service;
pub mod prompt_service;
pub mod variable_service;

pub use enhance_service::{rewrite, EnhanceService};
pub use history_service::HistoryService;
pub use prompt_service::PromptService;
pub use variable_service::VariableService;

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{CacheKey, ResponseCache};
use crate::database::RepositoryError;

/// Serves `key` from the response cache, or runs `load` and caches its
/// result. Errors are never cached, nor are results of a load that overlapped
/// a write to the same tenant prefix.
pub(crate) async fn cached<T, F, Fut>(cache: &ResponseCache, key: CacheKey, load: F) -> Result<T, RepositoryError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    if let Some(hit) = cache.get::<T>(&key) {
        return Ok(hit);
    }
    let generation = cache.generation(&key);
    let value = load().await?;
    cache.set_if_current(&key, &value, generation);
    Ok(value)
}
