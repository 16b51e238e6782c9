//! changebench Document Store
//!
//! This crate holds the documents the benchmark mutates. The producer seeds and
//! updates documents through it; the consumer reads it back when the feed does
//! not carry full documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  insert/update   ┌──────────────────┐
//! │   Producer   │ ───────────────► │  Document Store  │ ◄── You are here
//! └──────┬───────┘                  │     (SQLite)     │
//!        │ change feed              └────────┬─────────┘
//!        ▼                                   │ find_by_keys
//! ┌──────────────┐                           │
//! │   Consumer   │ ◄─────────────────────────┘
//! └──────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```ignore
//! use changebench_store::{DocumentStore, SqliteDocumentStore, StoredDocument};
//!
//! let store = SqliteDocumentStore::new("bench.db").await?;
//! store.insert(StoredDocument::new("doc-1".into(), json!({"counter": 0}))).await?;
//!
//! let docs = store.find_by_keys(&["doc-1".into()]).await?;
//! assert_eq!(docs.len(), 1);
//! ```
//!
//! ## Concurrency
//!
//! The producer and consumer run as separate processes against the same
//! database file. The SQLite store opens it in WAL mode with a busy timeout so
//! the consumer's reads do not block the producer's writes.

pub mod error;
pub mod memory;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use memory::MemoryDocumentStore;
pub use store::SqliteDocumentStore;
pub use types::StoredDocument;

use async_trait::async_trait;
use changebench_core::{Document, DocumentKey};

/// Storage backend for benchmark documents.
///
/// Implementations must be safe to share across tasks: the consumer issues
/// lookups from several overlapping batch tasks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Remove every document.
    async fn drop_collection(&self) -> Result<()>;

    /// Insert a new document. Fails if the key is already stored.
    async fn insert(&self, document: StoredDocument) -> Result<()>;

    /// Replace the body of an existing document.
    async fn update(&self, key: &DocumentKey, body: Document) -> Result<()>;

    /// Fetch a single document.
    async fn get(&self, key: &DocumentKey) -> Result<Option<StoredDocument>>;

    /// Bulk keyed lookup.
    ///
    /// Returns the current document for every distinct key that is stored,
    /// in no particular order. Missing keys are skipped.
    async fn find_by_keys(&self, keys: &[DocumentKey]) -> Result<Vec<StoredDocument>>;

    /// Number of stored documents.
    async fn count(&self) -> Result<u64>;

    /// Release connections. Further calls fail.
    async fn close(&self);
}
