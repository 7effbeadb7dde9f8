use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::database::store::Document;

/// Fields owned by the store; a record payload may never carry them.
pub const SYSTEM_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// A typed document shape stored in one per-tenant collection.
///
/// Implementors should use `#[serde(deny_unknown_fields)]` so that documents
/// of an unexpected shape are rejected at the unmarshal boundary instead of
/// passed through.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
}

/// A record as returned by the repository: store-assigned id and timestamps
/// plus the record's own fields, flattened on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: T,
}

/// Errors that can occur while marshalling records
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("System field '{0}' cannot be set via record payload")]
    SystemFieldNotAllowed(String),

    #[error("Record must serialise to a JSON object")]
    NotAnObject,

    #[error("Failed to serialise record: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Document {id} does not match the {collection} shape: {source}")]
    Unmarshal {
        id: String,
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Marshals a record into document data for the store.
pub fn to_document_data<T: Record>(record: &T) -> Result<Map<String, Value>, RecordError> {
    match serde_json::to_value(record).map_err(RecordError::Serialize)? {
        Value::Object(map) => {
            if let Some(field) = SYSTEM_FIELDS.iter().find(|f| map.contains_key(**f)) {
                return Err(RecordError::SystemFieldNotAllowed(field.to_string()));
            }
            Ok(map)
        }
        _ => Err(RecordError::NotAnObject),
    }
}

/// Unmarshals a store document into a typed record.
pub fn from_document<T: Record>(doc: Document) -> Result<Stored<T>, RecordError> {
    let Document {
        id,
        data,
        created_at,
        updated_at,
    } = doc;

    let record = serde_json::from_value::<T>(Value::Object(data)).map_err(|source| RecordError::Unmarshal {
        id: id.clone(),
        collection: T::COLLECTION,
        source,
    })?;

    Ok(Stored {
        id,
        created_at,
        updated_at,
        record,
    })
}
