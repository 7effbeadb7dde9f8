use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::store::{
    is_valid_field_name, CollectionPath, Document, DocumentQuery, DocumentStore, OrderField, SortDirection,
    StoreError,
};

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    doc: Document,
}

/// In-process document store. Used by `STORE_IN_MEMORY=true` deployments and
/// by the test suite; it honours the same ordering and ownership rules as the
/// Postgres store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    partitions: Mutex<HashMap<CollectionPath, HashMap<String, Entry>>>,
    next_seq: AtomicU64,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `data` under a caller-chosen id without any validation, the way
    /// another client of the database could. Tests use it to plant malformed
    /// documents.
    pub fn insert_raw(&self, path: &CollectionPath, id: &str, data: Map<String, Value>) -> Document {
        let now = Utc::now();
        let doc = Document {
            id: id.to_string(),
            data,
            created_at: now,
            updated_at: now,
        };
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::SeqCst);
        self.lock()
            .entry(path.clone())
            .or_default()
            .insert(id.to_string(), Entry { seq, doc: doc.clone() });
        doc
    }

    /// Number of documents in one partition.
    pub fn count(&self, path: &CollectionPath) -> usize {
        self.lock().get(path).map(|p| p.len()).unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CollectionPath, HashMap<String, Entry>>> {
        self.partitions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, path: &CollectionPath) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self
            .lock()
            .get(path)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by_key(|e| e.seq);
        entries
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query(&self, path: &CollectionPath, query: &DocumentQuery) -> Result<Vec<Document>, StoreError> {
        for (field, _) in &query.filters {
            if !is_valid_field_name(field) {
                return Err(StoreError::InvalidField(field.clone()));
            }
        }

        let mut entries: Vec<Entry> = self
            .snapshot(path)
            .into_iter()
            .filter(|e| {
                query
                    .filters
                    .iter()
                    .all(|(field, value)| e.doc.data.get(field) == Some(value))
            })
            .collect();

        if let Some(order) = &query.order_by {
            if let OrderField::Data(field) = &order.field {
                if !is_valid_field_name(field) {
                    return Err(StoreError::InvalidField(field.clone()));
                }
            }
            let direction = order.direction;
            entries.sort_by(|a, b| {
                let primary = match &order.field {
                    OrderField::CreatedAt => directed(a.doc.created_at.cmp(&b.doc.created_at), direction),
                    OrderField::UpdatedAt => directed(a.doc.updated_at.cmp(&b.doc.updated_at), direction),
                    OrderField::Data(field) => compare_json(a.doc.data.get(field), b.doc.data.get(field), direction),
                };
                primary.then_with(|| directed(a.seq.cmp(&b.seq), direction))
            });
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(entries
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .map(|e| e.doc)
            .collect())
    }

    async fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .lock()
            .get(path)
            .and_then(|p| p.get(id))
            .map(|e| e.doc.clone()))
    }

    async fn insert(&self, path: &CollectionPath, data: Map<String, Value>) -> Result<Document, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        Ok(self.insert_raw(path, &id, data))
    }

    async fn update(&self, path: &CollectionPath, id: &str, data: Map<String, Value>) -> Result<Document, StoreError> {
        let mut partitions = self.lock();
        let entry = partitions
            .get_mut(path)
            .and_then(|p| p.get_mut(id))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", path, id)))?;
        entry.doc.data = data;
        entry.doc.updated_at = Utc::now();
        Ok(entry.doc.clone())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .get_mut(path)
            .and_then(|p| p.remove(id))
            .is_some())
    }

    fn stream<'a>(&'a self, path: &CollectionPath) -> BoxStream<'a, Result<Document, StoreError>> {
        let docs = self.snapshot(path).into_iter().map(|e| Ok(e.doc));
        stream::iter(docs).boxed()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

/// Orders values like `ORDER BY data->'field' <dir> NULLS LAST`: a missing
/// field is SQL NULL and always sorts last; present values follow jsonb
/// ordering (null < string < number < boolean < array < object).
fn compare_json(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => directed(jsonb_cmp(a, b), direction),
    }
}

fn jsonb_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

// Containers compare by size first, then element-wise.
fn jsonb_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()).then_with(|| {
            x.iter()
                .zip(y)
                .map(|(l, r)| jsonb_cmp(l, r))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        }),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()).then_with(|| {
            let mut xs: Vec<_> = x.iter().collect();
            let mut ys: Vec<_> = y.iter().collect();
            xs.sort_by(|l, r| l.0.cmp(r.0));
            ys.sort_by(|l, r| l.0.cmp(r.0));
            xs.iter()
                .zip(&ys)
                .map(|(l, r)| l.0.cmp(r.0).then_with(|| jsonb_cmp(l.1, r.1)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        }),
        _ => jsonb_rank(a).cmp(&jsonb_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;

    fn data(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn partitions_are_isolated() {
        let store = MemoryDocumentStore::new();
        let mine = CollectionPath::new("u1", "prompts");
        let theirs = CollectionPath::new("u2", "prompts");

        let doc = store.insert(&mine, data(json!({"a": 1}))).await.unwrap();
        assert!(store.get(&theirs, &doc.id).await.unwrap().is_none());
        assert!(!store.delete(&theirs, &doc.id).await.unwrap());
        assert!(matches!(
            store.update(&theirs, &doc.id, Map::new()).await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.count(&mine), 1);
    }

    #[tokio::test]
    async fn orders_with_nulls_last_and_windows() {
        let store = MemoryDocumentStore::new();
        let path = CollectionPath::new("u1", "history");
        store.insert(&path, data(json!({"timestamp": "2024-01-02"}))).await.unwrap();
        store.insert(&path, data(json!({"other": true}))).await.unwrap();
        store.insert(&path, data(json!({"timestamp": "2024-01-03"}))).await.unwrap();
        store.insert(&path, data(json!({"timestamp": "2024-01-01"}))).await.unwrap();

        let query = DocumentQuery::new()
            .order_by(OrderField::Data("timestamp".into()), SortDirection::Desc)
            .limit(3);
        let docs = store.query(&path, &query).await.unwrap();
        let stamps: Vec<_> = docs.iter().map(|d| d.data["timestamp"].clone()).collect();
        assert_eq!(stamps, vec![json!("2024-01-03"), json!("2024-01-02"), json!("2024-01-01")]);

        let tail = store
            .query(&path, &query.clone().offset(3))
            .await
            .unwrap();
        assert_eq!(tail.len(), 1);
        assert!(tail[0].data.get("timestamp").is_none());
    }

    #[tokio::test]
    async fn mixed_types_follow_jsonb_ordering() {
        let store = MemoryDocumentStore::new();
        let path = CollectionPath::new("u1", "prompts");
        for v in [json!(true), json!(3), json!("b"), json!(null), json!(1), json!("a")] {
            store.insert(&path, data(json!({ "rank": v }))).await.unwrap();
        }
        store.insert(&path, data(json!({"other": 1}))).await.unwrap();

        let ranks = |docs: Vec<Document>| -> Vec<Option<Value>> {
            docs.iter().map(|d| d.data.get("rank").cloned()).collect()
        };

        let asc = DocumentQuery::new().order_by(OrderField::Data("rank".into()), SortDirection::Asc);
        assert_eq!(
            ranks(store.query(&path, &asc).await.unwrap()),
            vec![
                Some(json!(null)),
                Some(json!("a")),
                Some(json!("b")),
                Some(json!(1)),
                Some(json!(3)),
                Some(json!(true)),
                None,
            ]
        );

        let desc = DocumentQuery::new().order_by(OrderField::Data("rank".into()), SortDirection::Desc);
        assert_eq!(
            ranks(store.query(&path, &desc).await.unwrap()),
            vec![
                Some(json!(true)),
                Some(json!(3)),
                Some(json!(1)),
                Some(json!("b")),
                Some(json!("a")),
                Some(json!(null)),
                None,
            ]
        );
    }

    #[tokio::test]
    async fn equality_filter_and_stream() {
        let store = MemoryDocumentStore::new();
        let path = CollectionPath::new("u1", "prompts");
        store.insert(&path, data(json!({"prompt_name": "a"}))).await.unwrap();
        store.insert(&path, data(json!({"prompt_name": "b"}))).await.unwrap();

        let hits = store
            .query(&path, &DocumentQuery::new().where_eq("prompt_name", "b"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let all: Vec<Document> = store.stream(&path).try_collect().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].data["prompt_name"], json!("a"));
    }
}
