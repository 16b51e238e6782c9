//! Store Error Types
//!
//! ### Document Errors
//! - `DocumentNotFound`: an update targeted a key that is not stored
//! - `DocumentAlreadyExists`: an insert reused a stored key
//!
//! ### Database Errors
//! - `DatabaseError`: SQLite operation failed (connection, query, etc.)
//!
//! ### Data Errors
//! - `SerializationError`: a stored body is not valid JSON

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Document already exists: {0}")]
    DocumentAlreadyExists(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            StoreError::DocumentNotFound("doc-1".into()).to_string(),
            "Document not found: doc-1"
        );
        assert_eq!(
            StoreError::DocumentAlreadyExists("doc-1".into()).to_string(),
            "Document already exists: doc-1"
        );
    }

    #[test]
    fn test_from_serde_json() {
        let err: StoreError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::SerializationError(_)));
    }
}
