pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod record;
pub mod repositories;
pub mod repository;
pub mod search;
pub mod store;

pub use manager::{StoreHandle, StoreHealth};
pub use record::{Record, RecordError, Stored};
pub use repository::{RepositoryError, TenantRepository};
pub use store::{CollectionPath, Document, DocumentQuery, DocumentStore, StoreError};
