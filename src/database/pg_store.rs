use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use tracing::debug;

use super::manager::DatabaseManager;
use crate::store::{DocumentStore, StoreError, StoreResult};
use crate::types::{Document, ID_FIELD};

/// Postgres-backed store: one table per collection, documents kept as JSONB.
///
/// The row id is the document id; it is stripped from the stored JSON and
/// put back as `_id` on the way out.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    table: String,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, collection: &str) -> Result<Self, StoreError> {
        if !DatabaseManager::is_valid_collection_name(collection) {
            return Err(StoreError::InvalidCollection(collection.to_string()));
        }
        Ok(Self {
            pool,
            table: DatabaseManager::quote_identifier(collection),
        })
    }

    /// Create the backing table when it does not exist yet
    pub async fn ensure_table(&self) -> StoreResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (id BIGSERIAL PRIMARY KEY, doc JSONB NOT NULL DEFAULT '{{}}'::jsonb)",
            self.table
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    fn parse_id(id: &str) -> StoreResult<i64> {
        id.trim()
            .parse()
            .map_err(|_| StoreError::InvalidId(id.to_string()))
    }

    fn id_from_value(value: &Value) -> StoreResult<i64> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| StoreError::InvalidId(n.to_string())),
            Value::String(s) => Self::parse_id(s),
            other => Err(StoreError::InvalidId(other.to_string())),
        }
    }

    fn row_to_document(row: PgRow) -> StoreResult<Document> {
        let id: i64 = row.try_get("id")?;
        let Json(value): Json<Value> = row.try_get("doc")?;
        let mut doc = match value {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::Query(format!(
                    "row {} holds a non-object document: {}",
                    id, other
                )))
            }
        };
        doc.insert(ID_FIELD.to_string(), Value::from(id));
        Ok(doc)
    }

    fn without_id(doc: &Document) -> Document {
        let mut doc = doc.clone();
        doc.remove(ID_FIELD);
        doc
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Document>> {
        let id = Self::parse_id(id)?;
        let sql = format!("SELECT id, doc FROM {} WHERE id = $1", self.table);
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_document)
            .transpose()
    }

    async fn find_many(&self, filter: &Document) -> StoreResult<Vec<Document>> {
        let containment = Self::without_id(filter);
        let rows = match filter.get(ID_FIELD) {
            Some(id) => {
                let sql = format!(
                    "SELECT id, doc FROM {} WHERE doc @> $1 AND id = $2 ORDER BY id ASC",
                    self.table
                );
                sqlx::query(&sql)
                    .bind(Json(&containment))
                    .bind(Self::id_from_value(id)?)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT id, doc FROM {} WHERE doc @> $1 ORDER BY id ASC",
                    self.table
                );
                sqlx::query(&sql)
                    .bind(Json(&containment))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        debug!("find_many on {} returned {} rows", self.table, rows.len());
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn insert_one(&self, doc: Document) -> StoreResult<Document> {
        let sql = format!(
            "INSERT INTO {} (doc) VALUES ($1) RETURNING id, doc",
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(Json(Self::without_id(&doc)))
            .fetch_one(&self.pool)
            .await?;
        Self::row_to_document(row)
    }

    async fn update_by_id(&self, id: &str, patch: &Document) -> StoreResult<()> {
        let id = Self::parse_id(id)?;
        let sql = format!("UPDATE {} SET doc = doc || $1 WHERE id = $2", self.table);
        sqlx::query(&sql)
            .bind(Json(Self::without_id(patch)))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<()> {
        let id = Self::parse_id(id)?;
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }
}
