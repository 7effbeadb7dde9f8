use async_trait::async_trait;
use futures::TryStreamExt;
use tracing::debug;

use crate::database::record::{Record, Stored};
use crate::database::repository::{RepositoryError, TenantRepository};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Text fields of a record that substring search looks at.
pub trait Searchable: Record {
    fn search_fields(&self) -> Vec<&str>;
}

/// Per-tenant text search. Callers depend on this trait only, so the scan
/// below can be swapped for an indexed backend.
#[async_trait]
pub trait RecordSearch<T: Record>: Send + Sync {
    async fn search(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<Stored<T>>, RepositoryError>;
}

/// Linear scan of the tenant's partition with case-folded substring
/// matching. Stops as soon as `limit` matches are found. Only suitable for
/// small per-tenant collections.
pub struct ScanSearch<T> {
    repo: TenantRepository<T>,
}

impl<T: Searchable> ScanSearch<T> {
    pub fn new(repo: TenantRepository<T>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<T: Searchable> RecordSearch<T> for ScanSearch<T> {
    async fn search(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<Stored<T>>, RepositoryError> {
        let needle = query.to_lowercase();
        let mut results = Vec::new();
        if limit == 0 {
            return Ok(results);
        }

        let mut scan = self.repo.scan(user_id);
        while let Some(stored) = scan.try_next().await? {
            let hit = stored
                .record
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if hit {
                results.push(stored);
                if results.len() >= limit {
                    break;
                }
            }
        }

        debug!(
            "Found {} {} matching '{}' for user {}",
            results.len(),
            T::COLLECTION,
            query,
            user_id
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::manager::StoreHandle;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Doc {
        title: String,
        body: String,
    }

    impl Record for Doc {
        const COLLECTION: &'static str = "docs";
    }

    impl Searchable for Doc {
        fn search_fields(&self) -> Vec<&str> {
            vec![self.title.as_str(), self.body.as_str()]
        }
    }

    async fn seeded() -> ScanSearch<Doc> {
        let repo = TenantRepository::new(StoreHandle::memory());
        for (title, body) in [("Alpha", "one"), ("beta", "ALPHABET soup"), ("gamma", "none"), ("ALPHA again", "x")] {
            repo.create(
                "u1",
                &Doc {
                    title: title.into(),
                    body: body.into(),
                },
            )
            .await
            .unwrap();
        }
        ScanSearch::new(repo)
    }

    #[tokio::test]
    async fn matches_either_field_ignoring_case() {
        let search = seeded().await;
        let hits = search.search("u1", "alpha", 10).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(search.search("u2", "alpha", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stops_at_limit() {
        let search = seeded().await;
        let hits = search.search("u1", "ALPHA", 2).await.unwrap();
        let titles: Vec<_> = hits.iter().map(|h| h.record.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "beta"]);
    }

    #[tokio::test]
    async fn degraded_search_is_empty() {
        let search: ScanSearch<Doc> = ScanSearch::new(TenantRepository::new(StoreHandle::degraded()));
        assert!(search.search("u1", "a", 10).await.unwrap().is_empty());
    }
}
