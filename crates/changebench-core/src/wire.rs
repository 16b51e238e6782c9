//! Feed Wire Format
//!
//! A change feed travels between processes as newline-delimited JSON: one
//! `ChangeEvent` per line, in feed order.
//!
//! ```text
//! {"operationType":"insert","documentKey":"doc-0","fullDocument":{"counter":0}}
//! {"operationType":"update","documentKey":"doc-0","fullDocument":{"counter":1}}
//! {"operationType":"delete","documentKey":"doc-0"}
//! ```
//!
//! Blank lines are skipped. Any other line that does not decode is an error;
//! the caller decides whether that ends the feed.

use crate::error::{CoreError, Result};
use crate::event::ChangeEvent;

/// Encode one event as a single line, without the trailing newline.
pub fn encode_line(event: &ChangeEvent) -> Result<String> {
    serde_json::to_string(event).map_err(|e| CoreError::Encode(e.to_string()))
}

/// Decode one feed line.
///
/// Returns `Ok(None)` for blank lines.
pub fn decode_line(line: &str) -> Result<Option<ChangeEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| CoreError::Decode {
            line: truncate(trimmed, 120),
            reason: e.to_string(),
        })
}

fn truncate(line: &str, max_chars: usize) -> String {
    match line.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DocumentKey, OperationKind};
    use serde_json::json;

    #[test]
    fn test_encode_is_single_line() {
        let event = ChangeEvent::new(OperationKind::Insert, DocumentKey::from("doc-1"))
            .with_document(json!({"text": "multi\nline"}));
        let line = encode_line(&event).unwrap();
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_decode_blank_line() {
        assert!(decode_line("").unwrap().is_none());
        assert!(decode_line("   \r").unwrap().is_none());
    }

    #[test]
    fn test_decode_event() {
        let event = decode_line(r#"{"operationType":"update","documentKey":"doc-7"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.operation, OperationKind::Update);
        assert_eq!(event.document_key.as_str(), "doc-7");
    }

    #[test]
    fn test_decode_invalid_line() {
        let err = decode_line("{not json").unwrap_err();
        match err {
            CoreError::Decode { line, .. } => assert_eq!(line, "{not json"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_missing_key_is_error() {
        assert!(decode_line(r#"{"operationType":"update"}"#).is_err());
    }

    #[test]
    fn test_truncate_long_line() {
        let long = "x".repeat(500);
        let truncated = truncate(&long, 120);
        assert_eq!(truncated.len(), 123);
        assert!(truncated.ends_with("..."));
    }
}
