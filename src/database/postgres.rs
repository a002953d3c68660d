use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::database::store::{Document, DocumentStore, Filter, Modified, Mutator, Query};
use crate::error::{Error, Result};

/// Document store backed by a single PostgreSQL JSONB table.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: PgRow) -> Result<Document> {
    Ok(Document {
        id: row.try_get("id")?,
        data: row.try_get("data")?,
        version: row.try_get("version")?,
    })
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"SELECT id, data, version FROM documents WHERE collection = $1 AND id = $2"#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_document).transpose()
    }

    async fn create(&self, collection: &str, id: &str, data: &JsonValue) -> Result<Document> {
        let row = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, version)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (collection, id) DO NOTHING
            RETURNING id, data, version
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(data)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_document(row),
            None => Err(Error::Conflict(format!("{}/{} already exists", collection, id))),
        }
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        data: &JsonValue,
        expected_version: i64,
    ) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            UPDATE documents
            SET data = $3, version = version + 1, updated_at = NOW()
            WHERE collection = $1 AND id = $2 AND version = $4
            RETURNING id, data, version
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(data)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_document).transpose()
    }

    async fn delete(&self, collection: &str, id: &str, expected_version: i64) -> Result<bool> {
        let res = sqlx::query(
            r#"DELETE FROM documents WHERE collection = $1 AND id = $2 AND version = $3"#,
        )
        .bind(collection)
        .bind(id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn modify(
        &self,
        collection: &str,
        id: &str,
        mutate: Mutator<'_>,
    ) -> Result<Option<Modified>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT id, data, version FROM documents
            WHERE collection = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let current = row_to_document(row)?;

        let Some(data) = mutate(&current.data)? else {
            tx.commit().await?;
            return Ok(Some(Modified {
                document: current,
                written: false,
            }));
        };

        let row = sqlx::query(
            r#"
            UPDATE documents
            SET data = $3, version = version + 1, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            RETURNING id, data, version
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&data)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(Modified {
            document: row_to_document(row)?,
            written: true,
        }))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let mut filters = vec!["collection = $1".to_string()];
        let mut args: Vec<JsonValue> = Vec::new();

        // Equality is expressed as JSONB containment so it can use a GIN
        // index on `data`.
        for filter in &query.filters {
            let containment = match filter {
                Filter::Eq(field, value) => json!({ field.as_str(): value }),
            };
            filters.push(format!("data @> ${}", args.len() + 2));
            args.push(containment);
        }

        let sql = format!(
            "SELECT id, data, version FROM documents WHERE {} ORDER BY id ASC",
            filters.join(" AND ")
        );

        let mut statement = sqlx::query(&sql).bind(collection);
        for value in &args {
            statement = statement.bind(value);
        }

        let rows = statement.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_document).collect()
    }
}
