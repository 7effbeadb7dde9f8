use serde_json::{Map, Value};
use sqlx::postgres::PgArguments;

use crate::database::store::{is_valid_field_name, CollectionPath, DocumentQuery, OrderField, StoreError};

pub const DOCUMENTS_TABLE: &str = "documents";

const SELECT_COLUMNS: &str = "id, data, created_at, updated_at";

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Renders a [`DocumentQuery`] over one tenant partition of the `documents`
/// table. Field names are validated and inlined; every value is bound.
pub struct QueryBuilder<'a> {
    path: &'a CollectionPath,
    query: &'a DocumentQuery,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(path: &'a CollectionPath, query: &'a DocumentQuery) -> Self {
        Self { path, query }
    }

    pub fn to_sql(&self) -> Result<SqlResult, StoreError> {
        let mut params = vec![
            SqlParam::Text(self.path.user_id.clone()),
            SqlParam::Text(self.path.collection.clone()),
        ];
        let mut sql = format!(
            "SELECT {} FROM \"{}\" WHERE user_id = $1 AND collection = $2",
            SELECT_COLUMNS, DOCUMENTS_TABLE
        );

        if !self.query.filters.is_empty() {
            let mut containment = Map::new();
            for (field, value) in &self.query.filters {
                if !is_valid_field_name(field) {
                    return Err(StoreError::InvalidField(field.clone()));
                }
                containment.insert(field.clone(), value.clone());
            }
            params.push(SqlParam::Json(Value::Object(containment)));
            sql.push_str(&format!(" AND data @> ${}", params.len()));
        }

        sql.push(' ');
        sql.push_str(&self.order_clause()?);

        if let Some(limit) = self.query.limit {
            params.push(SqlParam::Int(to_i64(limit)));
            sql.push_str(&format!(" LIMIT ${}", params.len()));
        }
        if self.query.offset > 0 {
            params.push(SqlParam::Int(to_i64(self.query.offset)));
            sql.push_str(&format!(" OFFSET ${}", params.len()));
        }

        Ok(SqlResult { query: sql, params })
    }

    fn order_clause(&self) -> Result<String, StoreError> {
        // seq breaks ties between documents written in the same instant
        let Some(order) = &self.query.order_by else {
            return Ok("ORDER BY seq ASC".to_string());
        };
        let dir = order.direction.to_sql();
        let column = match &order.field {
            OrderField::CreatedAt => "created_at".to_string(),
            OrderField::UpdatedAt => "updated_at".to_string(),
            OrderField::Data(field) => {
                if !is_valid_field_name(field) {
                    return Err(StoreError::InvalidField(field.clone()));
                }
                format!("data->'{}'", field)
            }
        };
        Ok(format!("ORDER BY {} {} NULLS LAST, seq {}", column, dir, dir))
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

pub fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    p: &SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match p {
        SqlParam::Text(s) => q.bind(s.clone()),
        SqlParam::Int(i) => q.bind(*i),
        SqlParam::Json(v) => q.bind(v.clone()), // JSONB
    }
}
