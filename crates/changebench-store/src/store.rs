//! SQLite Document Store Implementation
//!
//! ## Schema
//!
//! ```text
//! documents
//! ├── id          TEXT PRIMARY KEY
//! ├── body        TEXT NOT NULL      (JSON)
//! └── updated_at  INTEGER NOT NULL   (ms since epoch)
//! ```
//!
//! The schema is created on connect, so a fresh file is usable immediately.
//!
//! ## Bulk Lookup
//!
//! `find_by_keys` de-duplicates the keys and issues one `IN (...)` query per
//! chunk of `MAX_KEYS_PER_QUERY` keys, staying under SQLite's bound-parameter
//! limit for large batches.

use crate::{
    error::{Result, StoreError},
    types::StoredDocument,
    DocumentStore,
};
use async_trait::async_trait;
use changebench_core::{Document, DocumentKey};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const MAX_KEYS_PER_QUERY: usize = 500;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY NOT NULL,
    body TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)
"#;

/// SQLite-based document store.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Open (or create) a document store at `path`.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;

        info!(path = %path.as_ref().display(), "Document store opened");
        Ok(Self { pool })
    }

    /// Create an in-memory store (for testing).
    ///
    /// Uses a single pinned connection: every SQLite in-memory connection is
    /// its own database.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn row_to_document(row: &SqliteRow) -> Result<StoredDocument> {
        let id: String = row.try_get("id")?;
        let body: String = row.try_get("body")?;
        let updated_at: i64 = row.try_get("updated_at")?;

        Ok(StoredDocument {
            key: DocumentKey::from(id),
            body: serde_json::from_str(&body)?,
            updated_at,
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn drop_collection(&self) -> Result<()> {
        let removed = sqlx::query("DELETE FROM documents")
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(removed, "Dropped document collection");
        Ok(())
    }

    async fn insert(&self, document: StoredDocument) -> Result<()> {
        let body = serde_json::to_string(&document.body)?;

        let result = sqlx::query("INSERT INTO documents (id, body, updated_at) VALUES (?, ?, ?)")
            .bind(document.key.as_str())
            .bind(body)
            .bind(document.updated_at)
            .execute(&self.pool)
            .await;

        if let Err(e) = result {
            if e.to_string().contains("UNIQUE constraint failed") {
                return Err(StoreError::DocumentAlreadyExists(document.key.to_string()));
            }
            return Err(e.into());
        }

        Ok(())
    }

    async fn update(&self, key: &DocumentKey, body: Document) -> Result<()> {
        let body = serde_json::to_string(&body)?;

        let rows_affected = sqlx::query("UPDATE documents SET body = ?, updated_at = ? WHERE id = ?")
            .bind(body)
            .bind(Self::now_ms())
            .bind(key.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::DocumentNotFound(key.to_string()));
        }

        Ok(())
    }

    async fn get(&self, key: &DocumentKey) -> Result<Option<StoredDocument>> {
        let row = sqlx::query("SELECT id, body, updated_at FROM documents WHERE id = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn find_by_keys(&self, keys: &[DocumentKey]) -> Result<Vec<StoredDocument>> {
        let mut seen = HashSet::with_capacity(keys.len());
        let distinct: Vec<&DocumentKey> = keys.iter().filter(|k| seen.insert(*k)).collect();

        let mut documents = Vec::with_capacity(distinct.len());

        for chunk in distinct.chunks(MAX_KEYS_PER_QUERY) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT id, body, updated_at FROM documents WHERE id IN (");
            let mut separated = builder.separated(", ");
            for key in chunk {
                separated.push_bind(key.as_str());
            }
            separated.push_unseparated(")");

            let rows = builder.build().fetch_all(&self.pool).await?;
            for row in &rows {
                documents.push(Self::row_to_document(row)?);
            }
        }

        debug!(
            requested = keys.len(),
            distinct = distinct.len(),
            found = documents.len(),
            "Bulk document lookup"
        );
        Ok(documents)
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
