use std::sync::Arc;

use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::database::memory::MemoryDocumentStore;
use crate::database::postgres::PgDocumentStore;
use crate::database::store::{DocumentStore, StoreError};

/// Connection to the document store, built once at startup and shared by
/// clone. A handle without a store is the degraded mode: repositories check
/// [`StoreHandle::store`] before every remote call and fail soft on reads.
#[derive(Clone)]
pub struct StoreHandle {
    store: Option<Arc<dyn DocumentStore>>,
}

/// Result of [`StoreHandle::health`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreHealth {
    Ok { backend: &'static str },
    Degraded,
    Unreachable { backend: &'static str, reason: String },
}

impl StoreHandle {
    /// Builds the handle from configuration: the in-memory store when asked
    /// for, Postgres when a URL is configured, otherwise degraded.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if config.in_memory {
            info!("Using in-memory document store");
            return Ok(Self::memory());
        }

        let Some(url) = config.url.as_deref() else {
            warn!("DATABASE_URL not set; document store running in degraded mode");
            return Ok(Self::degraded());
        };

        let store = PgDocumentStore::connect(url, config).await?;
        store.ensure_schema().await?;
        Ok(Self::from_store(Arc::new(store)))
    }

    pub fn from_store(store: Arc<dyn DocumentStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn memory() -> Self {
        Self::from_store(Arc::new(MemoryDocumentStore::new()))
    }

    pub fn degraded() -> Self {
        Self { store: None }
    }

    pub fn store(&self) -> Option<&Arc<dyn DocumentStore>> {
        self.store.as_ref()
    }

    pub fn is_degraded(&self) -> bool {
        self.store.is_none()
    }

    pub async fn health(&self) -> StoreHealth {
        match &self.store {
            None => StoreHealth::Degraded,
            Some(store) => match store.ping().await {
                Ok(()) => StoreHealth::Ok { backend: store.backend_name() },
                Err(e) => StoreHealth::Unreachable {
                    backend: store.backend_name(),
                    reason: e.to_string(),
                },
            },
        }
    }

    /// Closes the underlying connection (e.g., on shutdown).
    pub async fn close(&self) {
        if let Some(store) = &self.store {
            store.close().await;
        }
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("backend", &self.store.as_ref().map(|s| s.backend_name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn missing_url_yields_degraded_handle() {
        let config = AppConfig::development().database;
        let handle = StoreHandle::connect(&config).await.unwrap();
        assert!(handle.is_degraded());
        assert_eq!(handle.health().await, StoreHealth::Degraded);
    }

    #[tokio::test]
    async fn in_memory_handle_is_healthy() {
        let mut config = AppConfig::development().database;
        config.in_memory = true;
        let handle = StoreHandle::connect(&config).await.unwrap();
        assert_eq!(handle.health().await, StoreHealth::Ok { backend: "memory" });
        handle.close().await;
    }
}
