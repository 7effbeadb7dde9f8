use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::query_builder::{bind_param, QueryBuilder};
use crate::database::store::{CollectionPath, Document, DocumentQuery, DocumentStore, StoreError};

const CREATE_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    seq BIGSERIAL NOT NULL,
    user_id TEXT NOT NULL,
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (user_id, collection, id)
)
"#;

const CREATE_DOCUMENTS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_documents_partition_created
    ON documents (user_id, collection, created_at DESC, seq DESC)
"#;

const GET_DOCUMENT: &str = r#"
SELECT id, data, created_at, updated_at FROM documents
WHERE user_id = $1 AND collection = $2 AND id = $3
"#;

const INSERT_DOCUMENT: &str = r#"
INSERT INTO documents (user_id, collection, id, data)
VALUES ($1, $2, $3, $4)
RETURNING id, data, created_at, updated_at
"#;

// The ownership check and the write are one statement: a document deleted
// after an earlier read is simply not matched.
const UPDATE_DOCUMENT: &str = r#"
UPDATE documents SET data = $4, updated_at = now()
WHERE user_id = $1 AND collection = $2 AND id = $3
RETURNING id, data, created_at, updated_at
"#;

const DELETE_DOCUMENT: &str = r#"
DELETE FROM documents WHERE user_id = $1 AND collection = $2 AND id = $3
"#;

const STREAM_DOCUMENTS: &str = r#"
SELECT id, data, created_at, updated_at FROM documents
WHERE user_id = $1 AND collection = $2
ORDER BY seq ASC
"#;

/// Postgres-backed document store: one `documents` table, partitioned by
/// `(user_id, collection)`, documents kept as JSONB.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;
        info!("Created database pool for: {}", redact_url(url));
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_DOCUMENTS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_DOCUMENTS_INDEX).execute(&self.pool).await?;
        debug!("documents table ready");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn query(&self, path: &CollectionPath, query: &DocumentQuery) -> Result<Vec<Document>, StoreError> {
        let sql_result = QueryBuilder::new(path, query).to_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(GET_DOCUMENT)
            .bind(&path.user_id)
            .bind(&path.collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn insert(&self, path: &CollectionPath, data: Map<String, Value>) -> Result<Document, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let row = sqlx::query(INSERT_DOCUMENT)
            .bind(&path.user_id)
            .bind(&path.collection)
            .bind(&id)
            .bind(Value::Object(data))
            .fetch_one(&self.pool)
            .await?;
        row_to_document(&row)
    }

    async fn update(&self, path: &CollectionPath, id: &str, data: Map<String, Value>) -> Result<Document, StoreError> {
        let row = sqlx::query(UPDATE_DOCUMENT)
            .bind(&path.user_id)
            .bind(&path.collection)
            .bind(id)
            .bind(Value::Object(data))
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => row_to_document(&row),
            None => Err(StoreError::NotFound(format!("{}/{}", path, id))),
        }
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(DELETE_DOCUMENT)
            .bind(&path.user_id)
            .bind(&path.collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn stream<'a>(&'a self, path: &CollectionPath) -> BoxStream<'a, Result<Document, StoreError>> {
        sqlx::query(STREAM_DOCUMENTS)
            .bind(path.user_id.clone())
            .bind(path.collection.clone())
            .fetch(&self.pool)
            .map(|row| row.map_err(StoreError::from).and_then(|row| row_to_document(&row)))
            .boxed()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn row_to_document(row: &PgRow) -> Result<Document, StoreError> {
    let id: String = row.try_get("id")?;
    let data: Value = row.try_get("data")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    match data {
        Value::Object(data) => Ok(Document { id, data, created_at, updated_at }),
        other => Err(StoreError::Malformed {
            id,
            reason: format!("expected JSON object, found {}", json_kind(&other)),
        }),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Host and database name only; credentials stay out of the logs.
fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => format!(
            "{}://{}{}",
            parsed.scheme(),
            parsed.host_str().unwrap_or("localhost"),
            parsed.path()
        ),
        Err(_) => "<invalid url>".to_string(),
    }
}
