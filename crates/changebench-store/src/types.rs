use changebench_core::{Document, DocumentKey};
use serde::{Deserialize, Serialize};

/// A document as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub key: DocumentKey,
    pub body: Document,
    /// Last write, milliseconds since epoch.
    pub updated_at: i64,
}

impl StoredDocument {
    pub fn new(key: DocumentKey, body: Document) -> Self {
        Self {
            key,
            body,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
