//! Integration tests for the SQLite document store.
//!
//! The producer and consumer open the same database file from separate
//! processes; these tests open two handles on one file to cover that.

use changebench_core::DocumentKey;
use changebench_store::{DocumentStore, SqliteDocumentStore, StoredDocument};
use serde_json::json;
use std::sync::Arc;

async fn file_store(dir: &tempfile::TempDir) -> SqliteDocumentStore {
    SqliteDocumentStore::new(dir.path().join("bench.db"))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_writes_visible_to_second_handle() {
    let dir = tempfile::tempdir().unwrap();
    let writer = file_store(&dir).await;
    let reader = file_store(&dir).await;

    writer
        .insert(StoredDocument::new(DocumentKey::from("doc-1"), json!({"v": 1})))
        .await
        .unwrap();
    writer
        .update(&DocumentKey::from("doc-1"), json!({"v": 2}))
        .await
        .unwrap();

    let docs = reader
        .find_by_keys(&[DocumentKey::from("doc-1")])
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].body["v"], 2);
}

#[tokio::test]
async fn test_reopen_keeps_documents() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = file_store(&dir).await;
        for i in 0..3 {
            store
                .insert(StoredDocument::new(
                    DocumentKey::new(format!("doc-{i}")),
                    json!({"i": i}),
                ))
                .await
                .unwrap();
        }
        store.close().await;
    }

    let store = file_store(&dir).await;
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_concurrent_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(file_store(&dir).await);
    for i in 0..50 {
        store
            .insert(StoredDocument::new(
                DocumentKey::new(format!("doc-{i}")),
                json!({"i": i}),
            ))
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for t in 0..5 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let keys: Vec<DocumentKey> = (t * 10..t * 10 + 10)
                .map(|i| DocumentKey::new(format!("doc-{i}")))
                .collect();
            store.find_by_keys(&keys).await.unwrap().len()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 10);
    }
}

#[tokio::test]
async fn test_close_rejects_further_calls() {
    let store = SqliteDocumentStore::new_in_memory().await.unwrap();
    store.close().await;
    assert!(store.count().await.is_err());
}
