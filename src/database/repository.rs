use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::database::manager::StoreHandle;
use crate::database::record::{from_document, to_document_data, Record, RecordError, Stored};
use crate::database::store::{
    CollectionPath, Document, DocumentQuery, DocumentStore, OrderField, SortDirection, StoreError,
};

/// Errors from [`TenantRepository`]
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The record does not exist in the caller's partition, whether it was
    /// never created or belongs to another tenant.
    #[error("{collection} record not found: {id}")]
    NotFound { collection: &'static str, id: String },

    #[error("Document store unavailable")]
    StoreUnavailable,

    #[error(transparent)]
    InvalidRecord(#[from] RecordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// CRUD over one collection, scoped to a tenant partition
/// (`users/{user_id}/{collection}`).
///
/// Reads fail soft when the store handle is degraded (empty list, `None`,
/// `false`); `create` and `update` fail with
/// [`RepositoryError::StoreUnavailable`].
pub struct TenantRepository<T> {
    handle: StoreHandle,
    _phantom: PhantomData<T>,
}

impl<T> Clone for TenantRepository<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T: Record> TenantRepository<T> {
    pub fn new(handle: StoreHandle) -> Self {
        Self {
            handle,
            _phantom: PhantomData,
        }
    }

    pub fn collection(&self) -> &'static str {
        T::COLLECTION
    }

    pub fn path(&self, user_id: &str) -> CollectionPath {
        CollectionPath::new(user_id, T::COLLECTION)
    }

    fn store(&self, operation: &str) -> Option<&Arc<dyn DocumentStore>> {
        let store = self.handle.store();
        if store.is_none() {
            warn!("{} {}: document store unavailable (degraded mode)", T::COLLECTION, operation);
        }
        store
    }

    fn not_found(&self, id: &str) -> RepositoryError {
        RepositoryError::NotFound {
            collection: T::COLLECTION,
            id: id.to_string(),
        }
    }

    /// Newest first by creation time; `offset` is applied after ordering.
    pub async fn list(&self, user_id: &str, limit: usize, offset: usize) -> Result<Vec<Stored<T>>, RepositoryError> {
        let query = DocumentQuery::new()
            .order_by(OrderField::CreatedAt, SortDirection::Desc)
            .limit(limit)
            .offset(offset);
        self.find(user_id, &query).await
    }

    /// Runs an arbitrary query inside the tenant partition. Documents that do
    /// not unmarshal are skipped.
    pub async fn find(&self, user_id: &str, query: &DocumentQuery) -> Result<Vec<Stored<T>>, RepositoryError> {
        let Some(store) = self.store("find") else {
            return Ok(Vec::new());
        };
        let docs = store.query(&self.path(user_id), query).await?;
        debug!("{} find for user {}: {} documents", T::COLLECTION, user_id, docs.len());
        Ok(docs.into_iter().filter_map(unmarshal_or_skip::<T>).collect())
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<Stored<T>>, RepositoryError> {
        let Some(store) = self.store("get") else {
            return Ok(None);
        };
        let Some(doc) = store.get(&self.path(user_id), id).await? else {
            return Ok(None);
        };
        from_document::<T>(doc).map(Some).map_err(malformed)
    }

    /// Read side of a read-modify-write: unlike [`get`](Self::get), a missing
    /// store is an error and an absent record is `NotFound`.
    pub async fn get_existing(&self, user_id: &str, id: &str) -> Result<Stored<T>, RepositoryError> {
        let Some(store) = self.store("get_existing") else {
            return Err(RepositoryError::StoreUnavailable);
        };
        match store.get(&self.path(user_id), id).await? {
            Some(doc) => from_document::<T>(doc).map_err(malformed),
            None => Err(self.not_found(id)),
        }
    }

    pub async fn create(&self, user_id: &str, record: &T) -> Result<Stored<T>, RepositoryError> {
        let Some(store) = self.store("create") else {
            return Err(RepositoryError::StoreUnavailable);
        };
        let data = to_document_data(record)?;
        let doc = store.insert(&self.path(user_id), data).await.map_err(|e| {
            error!("{} create failed for user {}: {}", T::COLLECTION, user_id, e);
            e
        })?;
        debug!("Created {} {} for user {}", T::COLLECTION, doc.id, user_id);
        from_document::<T>(doc).map_err(malformed)
    }

    /// Replaces the record's data and re-stamps `updated_at`.
    pub async fn update(&self, user_id: &str, id: &str, record: &T) -> Result<Stored<T>, RepositoryError> {
        let Some(store) = self.store("update") else {
            return Err(RepositoryError::StoreUnavailable);
        };
        let path = self.path(user_id);
        let data = to_document_data(record)?;

        if store.get(&path, id).await?.is_none() {
            warn!("{} {} not found for user {}", T::COLLECTION, id, user_id);
            return Err(self.not_found(id));
        }

        // The store re-checks existence inside the write itself; a record
        // deleted since the lookup above surfaces as NotFound here.
        match store.update(&path, id, data).await {
            Ok(doc) => from_document::<T>(doc).map_err(malformed),
            Err(StoreError::NotFound(_)) => {
                warn!("{} {} vanished before update for user {}", T::COLLECTION, id, user_id);
                Err(self.not_found(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `Ok(false)` only in degraded mode; a missing record is `NotFound`.
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
        let Some(store) = self.store("delete") else {
            return Ok(false);
        };
        let path = self.path(user_id);

        if store.get(&path, id).await?.is_none() {
            warn!("{} {} not found for user {}", T::COLLECTION, id, user_id);
            return Err(self.not_found(id));
        }

        if store.delete(&path, id).await? {
            debug!("Deleted {} {} for user {}", T::COLLECTION, id, user_id);
            Ok(true)
        } else {
            Err(self.not_found(id))
        }
    }

    /// Best-effort bulk delete of the tenant's partition. Each document is
    /// deleted independently; failures are logged and counted, and reported
    /// once every document has been attempted.
    pub async fn delete_all(&self, user_id: &str) -> Result<usize, RepositoryError> {
        let Some(store) = self.store("delete_all") else {
            return Ok(0);
        };
        let path = self.path(user_id);

        let ids: Vec<String> = store.stream(&path).map_ok(|doc| doc.id).try_collect().await?;

        let mut deleted = 0;
        let mut failed = 0;
        for id in &ids {
            match store.delete(&path, id).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to delete {} {} for user {}: {}", T::COLLECTION, id, user_id, e);
                    failed += 1;
                }
            }
        }

        debug!("Deleted {} of {} {} documents for user {}", deleted, ids.len(), T::COLLECTION, user_id);
        if failed > 0 {
            return Err(StoreError::Backend(format!(
                "failed to delete {} of {} {} documents",
                failed,
                ids.len(),
                T::COLLECTION
            ))
            .into());
        }
        Ok(deleted)
    }

    /// Lazy scan over the tenant's partition, oldest first. Empty in degraded
    /// mode; malformed documents are skipped.
    pub fn scan(&self, user_id: &str) -> BoxStream<'_, Result<Stored<T>, RepositoryError>> {
        let Some(store) = self.store("scan") else {
            return stream::empty().boxed();
        };
        store
            .stream(&self.path(user_id))
            .filter_map(|res| async move {
                match res {
                    Ok(doc) => unmarshal_or_skip::<T>(doc).map(Ok),
                    Err(e) => Some(Err(RepositoryError::from(e))),
                }
            })
            .boxed()
    }
}

fn unmarshal_or_skip<T: Record>(doc: Document) -> Option<Stored<T>> {
    match from_document::<T>(doc) {
        Ok(stored) => Some(stored),
        Err(e) => {
            warn!("Skipping malformed document: {}", e);
            None
        }
    }
}

fn malformed(e: RecordError) -> RepositoryError {
    match e {
        RecordError::Unmarshal { id, source, .. } => StoreError::Malformed {
            id,
            reason: source.to_string(),
        }
        .into(),
        other => other.into(),
    }
}
