use sha2::{Digest, Sha256};
use tracing::{error, info};

use crate::cache::{CacheKey, ResponseCache};
use crate::services::HistoryService;

const ENHANCE_COLLECTION: &str = "enhance";

/// Deterministic prompt rewrite.
pub fn rewrite(text: &str) -> String {
    let mut enhanced = text.to_string();

    if !enhanced.ends_with(&['.', '!', '?'][..]) {
        enhanced.push('.');
    }
    if !enhanced.to_lowercase().contains("example") {
        enhanced.push_str(" Please provide specific examples.");
    }
    let lower = enhanced.to_lowercase();
    if !lower.contains("clear") && !lower.contains("concise") {
        enhanced.push_str(" Make your response clear and concise.");
    }

    enhanced
}

#[derive(Clone)]
pub struct EnhanceService {
    history: HistoryService,
    cache: ResponseCache,
}

impl EnhanceService {
    pub fn new(history: HistoryService, cache: ResponseCache) -> Self {
        Self { history, cache }
    }

    /// Rewrites `text` (memoised per user) and records the operation in the
    /// user's history. A failed history write is logged, not returned.
    pub async fn enhance(&self, user_id: &str, text: &str) -> String {
        let key = CacheKey::new(ENHANCE_COLLECTION, user_id, "rewrite").with_param(digest(text));
        let enhanced = match self.cache.get::<String>(&key) {
            Some(hit) => hit,
            None => {
                let enhanced = rewrite(text);
                self.cache.set(&key, &enhanced);
                enhanced
            }
        };

        if let Err(e) = self.history.add_entry(user_id, text, &enhanced).await {
            error!("Failed to record history for user {}: {}", user_id, e);
        }

        info!("Prompt enhanced for user {}", user_id);
        enhanced
    }
}

fn digest(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::StoreHandle;
    use std::time::Duration;

    #[test]
    fn rewrite_rules() {
        assert_eq!(
            rewrite("Write a poem"),
            "Write a poem. Please provide specific examples. Make your response clear and concise."
        );
        assert_eq!(rewrite("Give an Example!"), "Give an Example! Make your response clear and concise.");
        assert_eq!(rewrite("Be concise?"), "Be concise? Please provide specific examples.");
        assert_eq!(rewrite(""), ". Please provide specific examples. Make your response clear and concise.");
    }

    #[tokio::test]
    async fn every_call_is_recorded_even_when_cached() {
        let cache = ResponseCache::new(Duration::from_secs(60), 100);
        let history = HistoryService::new(StoreHandle::memory(), cache.clone());
        let svc = EnhanceService::new(history.clone(), cache);

        let first = svc.enhance("u1", "hello").await;
        let second = svc.enhance("u1", "hello").await;
        assert_eq!(first, second);
        assert_eq!(history.list("u1", 20, 0).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn degraded_store_still_enhances() {
        let cache = ResponseCache::new(Duration::from_secs(60), 100);
        let svc = EnhanceService::new(HistoryService::new(StoreHandle::degraded(), cache.clone()), cache);
        assert_eq!(svc.enhance("u1", "Clear example.").await, "Clear example.");
    }
}
