//! In-memory document store.
//!
//! Holds documents in a `HashMap` behind a tokio `RwLock`. Used when producer
//! and consumer run in one process, and in tests that run on a paused clock,
//! where SQLite's background worker would race the auto-advancing timer.

use crate::{
    error::{Result, StoreError},
    types::StoredDocument,
    DocumentStore,
};
use async_trait::async_trait;
use changebench_core::{Document, DocumentKey};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<DocumentKey, StoredDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn drop_collection(&self) -> Result<()> {
        self.documents.write().await.clear();
        Ok(())
    }

    async fn insert(&self, document: StoredDocument) -> Result<()> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(&document.key) {
            return Err(StoreError::DocumentAlreadyExists(document.key.to_string()));
        }
        documents.insert(document.key.clone(), document);
        Ok(())
    }

    async fn update(&self, key: &DocumentKey, body: Document) -> Result<()> {
        let mut documents = self.documents.write().await;
        let stored = documents
            .get_mut(key)
            .ok_or_else(|| StoreError::DocumentNotFound(key.to_string()))?;
        stored.body = body;
        stored.updated_at = chrono::Utc::now().timestamp_millis();
        Ok(())
    }

    async fn get(&self, key: &DocumentKey) -> Result<Option<StoredDocument>> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn find_by_keys(&self, keys: &[DocumentKey]) -> Result<Vec<StoredDocument>> {
        let documents = self.documents.read().await;
        let mut seen = HashSet::with_capacity(keys.len());
        Ok(keys
            .iter()
            .filter(|k| seen.insert(*k))
            .filter_map(|k| documents.get(k).cloned())
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.documents.read().await.len() as u64)
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_basics() {
        let store = MemoryDocumentStore::new();
        store
            .insert(StoredDocument::new(DocumentKey::from("a"), json!({"v": 1})))
            .await
            .unwrap();
        assert!(store
            .insert(StoredDocument::new(DocumentKey::from("a"), json!({})))
            .await
            .is_err());

        store.update(&DocumentKey::from("a"), json!({"v": 2})).await.unwrap();
        let found = store
            .find_by_keys(&[DocumentKey::from("a"), DocumentKey::from("a"), DocumentKey::from("b")])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].body["v"], 2);

        store.drop_collection().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
