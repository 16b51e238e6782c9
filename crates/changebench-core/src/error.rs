//! Error Types for changebench-core
//!
//! The core crate only fails while turning feed lines into events (or back).
//!
//! ## Error Categories
//!
//! - `Decode`: a feed line is not a valid change event
//! - `Encode`: an event could not be serialized
//! - `Io`: the underlying reader or writer failed
//!
//! ## Example
//! ```ignore
//! use changebench_core::{wire, CoreError};
//!
//! match wire::decode_line(line) {
//!     Ok(Some(event)) => handle(event),
//!     Ok(None) => {} // blank line
//!     Err(CoreError::Decode { line, .. }) => eprintln!("bad line: {}", line),
//!     Err(e) => return Err(e),
//! }
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode change event ({reason}): {line}")]
    Decode { line: String, reason: String },

    #[error("Failed to encode change event: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
