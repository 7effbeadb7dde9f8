use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors surfaced by a [`DocumentStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid field name: {0}")]
    InvalidField(String),

    #[error("Malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// One tenant's partition of a collection: `users/{user_id}/{collection}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    pub user_id: String,
    pub collection: String,
}

impl CollectionPath {
    pub fn new(user_id: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            collection: collection.into(),
        }
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "users/{}/{}", self.user_id, self.collection)
    }
}

/// A stored document as the store sees it: opaque data plus the
/// store-assigned id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Field a query orders by: one of the store-managed timestamps, or a
/// top-level field of the document data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderField {
    CreatedAt,
    UpdatedAt,
    Data(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: OrderField,
    pub direction: SortDirection,
}

/// Equality filters, ordering and a limit/offset window over one partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: OrderField, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy { field, direction });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Field names reach SQL as identifiers; only plain identifiers are allowed.
pub fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Access primitives of the external document database.
///
/// Implementations assign document ids and both timestamps on `insert`,
/// re-stamp `updated_at` on `update`, and must make `update` fail with
/// [`StoreError::NotFound`] when the document no longer exists at the time of
/// the write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(&self, path: &CollectionPath, query: &DocumentQuery) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Document>, StoreError>;

    async fn insert(&self, path: &CollectionPath, data: Map<String, Value>) -> Result<Document, StoreError>;

    async fn update(&self, path: &CollectionPath, id: &str, data: Map<String, Value>) -> Result<Document, StoreError>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<bool, StoreError>;

    /// Lazy scan of every document in the partition, oldest first.
    fn stream<'a>(&'a self, path: &CollectionPath) -> BoxStream<'a, Result<Document, StoreError>>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn close(&self) {}

    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_field_names() {
        assert!(is_valid_field_name("prompt_name"));
        assert!(is_valid_field_name("_x1"));
        assert!(!is_valid_field_name(""));
        assert!(!is_valid_field_name("1abc"));
        assert!(!is_valid_field_name("name'; DROP TABLE documents"));
        assert!(!is_valid_field_name("a-b"));
    }

    #[test]
    fn collection_path_renders_tenant_partition() {
        let path = CollectionPath::new("u1", "prompts");
        assert_eq!(path.to_string(), "users/u1/prompts");
    }
}
