use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::filter::Filter;
use crate::pipeline::Pipeline;
use crate::types::{Collection, Document, ID_FIELD};

use super::store::{DocumentStore, StoreError};

/// PostgreSQL unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Documents live in one JSONB table keyed by collection. `seq` gives the
/// natural order that listings follow.
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the documents table and its indexes when missing
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                seq BIGSERIAL PRIMARY KEY,
                collection TEXT NOT NULL,
                id UUID NOT NULL UNIQUE,
                body JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS documents_collection_seq_idx ON documents (collection, seq)")
            .execute(&self.pool)
            .await?;

        info!("Document store schema ready");
        Ok(())
    }

    /// `WHERE` clause for a collection plus filter, with `$1` bound to the collection
    fn where_clause(filter: &Filter) -> Result<(String, Vec<Value>), StoreError> {
        let mut clause = "collection = $1".to_string();
        let mut params = Vec::new();
        if !filter.is_empty() {
            let sql = filter.to_where_sql("body", 1)?;
            clause.push_str(" AND ");
            clause.push_str(&sql.query);
            params = sql.params;
        }
        Ok((clause, params))
    }

    async fn select(&self, collection: Collection, filter: &Filter, limit: Option<i64>) -> Result<Vec<Document>, StoreError> {
        let (clause, params) = Self::where_clause(filter)?;
        let mut sql = format!("SELECT body FROM documents WHERE {} ORDER BY seq", clause);
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        debug!(%collection, sql = %sql, "select documents");

        let mut query = sqlx::query_scalar::<_, Json<Document>>(&sql).bind(collection.as_str());
        for param in params {
            query = query.bind(param);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|Json(document)| document).collect())
    }

    fn write_error(collection: Collection, error: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::Duplicate {
                    collection,
                    detail: db_error.message().to_string(),
                };
            }
        }
        StoreError::Sqlx(error)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.select(collection, filter, None).await
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, StoreError> {
        Ok(self.select(collection, filter, Some(1)).await?.into_iter().next())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let (clause, params) = Self::where_clause(filter)?;
        let sql = format!("SELECT COUNT(*) FROM documents WHERE {}", clause);

        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(collection.as_str());
        for param in params {
            query = query.bind(param);
        }
        let count = query.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, collection: Collection, mut document: Document) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection.as_str())
            .bind(id)
            .bind(Json(&document))
            .execute(&self.pool)
            .await
            .map_err(|e| Self::write_error(collection, e))?;
        Ok(id)
    }

    async fn replace(&self, collection: Collection, id: Uuid, mut document: Document) -> Result<u64, StoreError> {
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let result = sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .bind(Json(&document))
            .execute(&self.pool)
            .await
            .map_err(|e| Self::write_error(collection, e))?;
        Ok(result.rows_affected())
    }

    async fn push(
        &self,
        collection: Collection,
        id: Uuid,
        field: &str,
        value: Value,
        mut updates: Document,
    ) -> Result<u64, StoreError> {
        Filter::validate_field(field)?;
        if field.contains('.') {
            return Err(StoreError::Query(format!("push field must be top-level: {}", field)));
        }
        updates.remove(ID_FIELD);

        // Single statement, so concurrent appends never overwrite each other
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = jsonb_set(
                    body,
                    ARRAY[$3::text],
                    COALESCE(NULLIF(body->$3, 'null'::jsonb), '[]'::jsonb) || $4::jsonb
                ) || $5::jsonb
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(field)
        .bind(Json(vec![value]))
        .bind(Json(&updates))
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_error(collection, e))?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn aggregate(&self, collection: Collection, pipeline: &Pipeline) -> Result<Vec<Document>, StoreError> {
        pipeline.run(self, collection).await
    }

    async fn ensure_unique(&self, collection: Collection, field: &str) -> Result<(), StoreError> {
        // Both names are validated identifiers, never caller input
        Filter::validate_field(field)?;
        if field.contains('.') {
            return Err(StoreError::Query(format!("unique field must be top-level: {}", field)));
        }
        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS documents_{coll}_{field}_key ON documents ((body->>'{field}')) WHERE collection = '{coll}'",
            coll = collection.as_str(),
            field = field,
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        debug!(%collection, field, "unique index ensured");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
