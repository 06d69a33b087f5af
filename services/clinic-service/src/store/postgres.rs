use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{Collection, DocumentQuery, DocumentStore, StoreResult, StoredDocument};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self::new(db))
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        Ok(())
    }
}

fn document_from_row(row: PgRow) -> StoreResult<StoredDocument> {
    let id: Uuid = row.try_get("id")?;
    let center_id: Option<Uuid> = row.try_get("center_id")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
    let Json(body): Json<Value> = row.try_get("body")?;
    Ok(StoredDocument {
        id,
        center_id,
        updated_at,
        body,
    })
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(&self, collection: Collection, doc: StoredDocument) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO documents (collection, id, center_id, updated_at, body)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(collection.as_str())
        .bind(doc.id)
        .bind(doc.center_id)
        .bind(doc.updated_at)
        .bind(Json(doc.body))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> StoreResult<Option<StoredDocument>> {
        let row = sqlx::query(
            "SELECT id, center_id, updated_at, body FROM documents
             WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(document_from_row).transpose()
    }

    async fn replace(&self, collection: Collection, doc: StoredDocument) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE documents SET center_id = $3, updated_at = $4, body = $5
             WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(doc.id)
        .bind(doc.center_id)
        .bind(doc.updated_at)
        .bind(Json(doc.body))
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(
        &self,
        collection: Collection,
        query: &DocumentQuery,
    ) -> StoreResult<Vec<StoredDocument>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, center_id, updated_at, body FROM documents WHERE collection = ",
        );
        builder.push_bind(collection.as_str());
        if let Some(center_id) = query.center_id {
            builder.push(" AND center_id = ").push_bind(center_id);
        }
        for (name, value) in &query.fields {
            builder
                .push(" AND body -> ")
                .push_bind(name.clone())
                .push(" = ")
                .push_bind(Json(value.clone()));
        }
        builder.push(" ORDER BY updated_at DESC, id ASC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.db).await?;
        rows.into_iter().map(document_from_row).collect()
    }
}
