//! Error types for changebench client operations.
//!
//! ## Error Handling Strategy
//!
//! - **Fatal, before the run**: `ConfigError`, `FeedConnect`, `StoreError`
//! - **Fatal, during the run**: `SeedingTimeout`, `FeedClosed`, `FeedTransport`,
//!   `Interrupted`
//! - **Recoverable**: `ProcessingFailed` is logged by the consumer and the
//!   batch is still recorded; it never ends the run
//!
//! Every fatal error maps to a process exit status through
//! [`ClientError::exit_code`].
//!
//! ## Examples
//!
//! ```ignore
//! match consumer.run(feed).await {
//!     Ok(report) => println!("{}", report),
//!     Err(ClientError::SeedingTimeout(waited)) => {
//!         eprintln!("producer never reached the update phase ({:?})", waited);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

/// Convenience type alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Exit status for a successful run.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status for any failure without a more specific code.
pub const EXIT_FAILURE: u8 = 1;
/// Exit status when the seeding phase times out.
pub const EXIT_SEEDING_TIMEOUT: u8 = 2;
/// Exit status when stopped before measurement began.
pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid consumer or producer configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The event feed could not be opened.
    #[error("Failed to connect to event feed {0}: {1}")]
    FeedConnect(String, String),

    /// The feed failed mid-stream. No reconnection is attempted.
    #[error("Event feed transport error: {0}")]
    FeedTransport(String),

    /// The feed ended before any measured event arrived.
    #[error("Event feed closed before measurement started")]
    FeedClosed,

    /// No measured event arrived within the seeding timeout.
    #[error("Seeding phase timed out after {0:?} without a measured event")]
    SeedingTimeout(Duration),

    /// Stop requested before any measured event arrived.
    #[error("Run interrupted before measurement started")]
    Interrupted,

    /// Document store operation failed.
    #[error("Store error: {0}")]
    StoreError(#[from] changebench_store::StoreError),

    /// Simulated batch work failed.
    #[error("Batch processing failed: {0}")]
    ProcessingFailed(String),

    /// Event sink failed while producing.
    #[error("Event sink error: {0}")]
    SinkError(String),

    /// Internal error that shouldn't normally occur.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ClientError::SeedingTimeout(_) => EXIT_SEEDING_TIMEOUT,
            ClientError::Interrupted => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }
}

impl From<changebench_core::CoreError> for ClientError {
    fn from(e: changebench_core::CoreError) -> Self {
        ClientError::FeedTransport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            ClientError::SeedingTimeout(Duration::from_secs(1)).exit_code(),
            EXIT_SEEDING_TIMEOUT
        );
        assert_eq!(ClientError::Interrupted.exit_code(), EXIT_INTERRUPTED);
        assert_eq!(ClientError::FeedClosed.exit_code(), EXIT_FAILURE);
        assert_eq!(
            ClientError::FeedTransport("reset".into()).exit_code(),
            EXIT_FAILURE
        );
        assert_ne!(EXIT_SEEDING_TIMEOUT, EXIT_SUCCESS);
    }

    #[test]
    fn test_core_error_is_transport_error() {
        let core = changebench_core::CoreError::Decode {
            line: "{".into(),
            reason: "eof".into(),
        };
        let err: ClientError = core.into();
        assert!(matches!(err, ClientError::FeedTransport(_)));
    }

    #[test]
    fn test_display() {
        let err = ClientError::FeedConnect("feed.ndjson".into(), "not found".into());
        assert_eq!(
            err.to_string(),
            "Failed to connect to event feed feed.ndjson: not found"
        );
    }
}
