//! Change Event Data Structure
//!
//! This module defines `ChangeEvent`, the unit of data on a change feed.
//!
//! ## What is a Change Event?
//! A change event describes one mutation observed on a watched collection:
//! - **operation kind**: what happened (`insert`, `update`, `delete`, `drop`, ...)
//! - **document key**: which document was affected (opaque identifier)
//! - **embedded document**: optional full snapshot of the document, only present
//!   when the feed is configured to carry it and the operation supports it
//!
//! ## Ordering
//! Events arrive in a single total order. Nothing in this crate reorders them.
//!
//! ## Example
//! ```ignore
//! let event = ChangeEvent::new(OperationKind::Update, DocumentKey::from("doc-42"))
//!     .with_document(serde_json::json!({"counter": 3}));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A full document snapshot as carried on the feed or stored in the store.
pub type Document = serde_json::Value;

/// The kind of mutation a change event describes.
///
/// Unknown operation names are preserved in `Other` so the consumer can
/// classify them as non-measured instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    /// A new document was inserted.
    Insert,
    /// An existing document was updated.
    Update,
    /// A document was deleted.
    Delete,
    /// The watched collection was dropped.
    Drop,
    /// Any other operation (rename, invalidate, ...).
    Other(String),
}

impl OperationKind {
    /// Parse an operation name (case-insensitive). Never fails.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "insert" => OperationKind::Insert,
            "update" => OperationKind::Update,
            "delete" => OperationKind::Delete,
            "drop" => OperationKind::Drop,
            other => OperationKind::Other(other.to_string()),
        }
    }

    /// Lowercase wire name of this operation.
    pub fn as_str(&self) -> &str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Drop => "drop",
            OperationKind::Other(name) => name,
        }
    }

    /// Whether a feed may attach a full document to this operation.
    pub fn supports_document(&self) -> bool {
        matches!(self, OperationKind::Insert | OperationKind::Update)
    }
}

impl From<String> for OperationKind {
    fn from(name: String) -> Self {
        OperationKind::parse(&name)
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier of the affected document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for DocumentKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One notification from the change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// What happened.
    #[serde(rename = "operationType")]
    pub operation: OperationKind,

    /// Which document it happened to.
    #[serde(rename = "documentKey")]
    pub document_key: DocumentKey,

    /// Full document snapshot, when the feed carries one.
    #[serde(
        rename = "fullDocument",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub embedded_document: Option<Document>,
}

impl ChangeEvent {
    pub fn new(operation: OperationKind, document_key: DocumentKey) -> Self {
        Self {
            operation,
            document_key,
            embedded_document: None,
        }
    }

    /// Attach a full document snapshot.
    pub fn with_document(mut self, document: Document) -> Self {
        self.embedded_document = Some(document);
        self
    }

    /// Remove the embedded document, if any.
    pub fn strip_document(&mut self) {
        self.embedded_document = None;
    }
}
