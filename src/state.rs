use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenVerifier;
use crate::cache::ResponseCache;
use crate::config::AppConfig;
use crate::database::StoreHandle;
use crate::services::{EnhanceService, HistoryService, PromptService, VariableService};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: StoreHandle,
    pub verifier: Arc<TokenVerifier>,
    pub cache: ResponseCache,
    pub prompts: PromptService,
    pub history: HistoryService,
    pub variables: VariableService,
    pub enhance: EnhanceService,
}

impl AppState {
    pub fn new(config: AppConfig, store: StoreHandle, verifier: TokenVerifier) -> Self {
        let cache = ResponseCache::new(
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.max_entries,
        );
        let prompts = PromptService::new(store.clone(), cache.clone());
        let history = HistoryService::new(store.clone(), cache.clone());
        let variables = VariableService::new(store.clone(), cache.clone());
        let enhance = EnhanceService::new(history.clone(), cache.clone());

        Self {
            config: Arc::new(config),
            store,
            verifier: Arc::new(verifier),
            cache,
            prompts,
            history,
            variables,
            enhance,
        }
    }
}
