use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use super::query::like_prefix_pattern;
use super::{
    DocumentStore, Item, Lookup, PutCondition, QueryRequest, Record, SortCondition, StoreError,
};
use crate::document::DocumentKey;

/// PostgreSQL-backed store.
///
/// One table keyed by `(id, version)`; the full document lives in a JSONB
/// `body` column and `doc_type`/`path` are duplicated into plain columns
/// covered by the type-path index.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    table: String,
    index: String,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, table_name: &str, index_name: &str) -> Result<Self, StoreError> {
        Ok(Self {
            pool,
            table: quote_identifier(table_name)?,
            index: quote_identifier(index_name)?,
        })
    }

    /// Create the table and the type-path index if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id TEXT NOT NULL,
                version TEXT NOT NULL,
                doc_type TEXT NOT NULL,
                path TEXT NOT NULL,
                body JSONB NOT NULL,
                PRIMARY KEY (id, version)
            )",
            self.table
        );
        sqlx::query(&create_table).execute(&self.pool).await?;

        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (doc_type, path text_pattern_ops)",
            self.index, self.table
        );
        sqlx::query(&create_index).execute(&self.pool).await?;

        tracing::info!(table = %self.table, index = %self.index, "document schema ready");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, key: &DocumentKey) -> Result<Lookup<Item>, StoreError> {
        let sql = format!("SELECT body FROM {} WHERE id = $1 AND version = $2", self.table);
        let row: Option<Json<Item>> = sqlx::query_scalar(&sql)
            .bind(&key.id)
            .bind(&key.version)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|Json(item)| item).into())
    }

    async fn put(&self, record: Record, condition: PutCondition) -> Result<(), StoreError> {
        match condition {
            PutCondition::Always => {
                let sql = format!(
                    "INSERT INTO {} (id, version, doc_type, path, body)
                     VALUES ($1, $2, $3, $4, $5)
                     ON CONFLICT (id, version) DO UPDATE
                     SET doc_type = EXCLUDED.doc_type, path = EXCLUDED.path, body = EXCLUDED.body",
                    self.table
                );
                sqlx::query(&sql)
                    .bind(&record.key.id)
                    .bind(&record.key.version)
                    .bind(record.kind.as_str())
                    .bind(&record.path)
                    .bind(Json(&record.body))
                    .execute(&self.pool)
                    .await
                    .map_err(StoreError::from_write)?;
            }
            PutCondition::UpdatedAtEquals(expected) => {
                let sql = format!(
                    "UPDATE {} SET doc_type = $3, path = $4, body = $5
                     WHERE id = $1 AND version = $2 AND body -> 'updatedAt' = $6",
                    self.table
                );
                let expected = serde_json::to_value(expected)?;
                let result = sqlx::query(&sql)
                    .bind(&record.key.id)
                    .bind(&record.key.version)
                    .bind(record.kind.as_str())
                    .bind(&record.path)
                    .bind(Json(&record.body))
                    .bind(Json(expected))
                    .execute(&self.pool)
                    .await
                    .map_err(StoreError::from_write)?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::ConditionFailed(record.key));
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &DocumentKey) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1 AND version = $2", self.table);
        sqlx::query(&sql)
            .bind(&key.id)
            .bind(&key.version)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_write)?;
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<Item>, StoreError> {
        let (predicate, value) = match &request.condition.path {
            SortCondition::Equals(path) => ("path = $2", path.clone()),
            SortCondition::BeginsWith(prefix) => {
                ("path LIKE $2 ESCAPE '\\'", like_prefix_pattern(prefix))
            }
        };
        let sql = format!(
            "SELECT body FROM {} WHERE doc_type = $1 AND {predicate} ORDER BY path, id",
            self.table
        );

        tracing::debug!(
            index = %request.index_name,
            condition = %request.condition,
            "querying documents"
        );

        let rows: Vec<Json<Item>> = sqlx::query_scalar(&sql)
            .bind(request.condition.kind.as_str())
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|Json(item)| request.projection.apply(item))
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Double-quote a table or index name after checking it is usable as one.
pub fn quote_identifier(name: &str) -> Result<String, StoreError> {
    if name.is_empty() || name.len() > 63 || name.contains(['"', '\0']) {
        return Err(StoreError::Config(format!("invalid identifier {name:?}")));
    }
    Ok(format!("\"{name}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_identifier("documents").unwrap(), "\"documents\"");
        assert_eq!(quote_identifier("type-path-index").unwrap(), "\"type-path-index\"");
    }

    #[test]
    fn unsafe_identifiers_are_rejected() {
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("bad\"name").is_err());
        assert!(quote_identifier(&"x".repeat(64)).is_err());
    }
}
