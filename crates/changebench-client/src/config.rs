//! Consumer and producer configuration.

use crate::error::{ClientError, Result};
use changebench_core::OperationKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default seeding timeout (5 minutes).
pub const DEFAULT_SEEDING_TIMEOUT: Duration = Duration::from_secs(300);
/// Default idle-shutdown timeout.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default bound on concurrently processed batches.
pub const DEFAULT_MAX_IN_FLIGHT_BATCHES: usize = 4;

/// Whether the feed carries full documents on update events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FullDocumentMode {
    /// Updates carry only the document key.
    #[serde(rename = "default")]
    Default,
    /// Updates carry the current full document.
    #[serde(rename = "updateLookup")]
    UpdateLookup,
}

impl FullDocumentMode {
    /// How the processor must obtain documents under this mode.
    pub fn processor_mode(&self) -> ProcessorMode {
        match self {
            FullDocumentMode::Default => ProcessorMode::Lookup,
            FullDocumentMode::UpdateLookup => ProcessorMode::Embedded,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FullDocumentMode::Default => "default",
            FullDocumentMode::UpdateLookup => "updateLookup",
        }
    }
}

impl FromStr for FullDocumentMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(FullDocumentMode::Default),
            "updatelookup" | "update_lookup" | "update-lookup" => {
                Ok(FullDocumentMode::UpdateLookup)
            }
            other => Err(ClientError::ConfigError(format!(
                "invalid full document mode '{}': must be 'default' or 'updateLookup'",
                other
            ))),
        }
    }
}

impl fmt::Display for FullDocumentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a batch's documents are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorMode {
    /// Bulk keyed lookup against the store.
    Lookup,
    /// Documents embedded in the events.
    Embedded,
}

impl ProcessorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorMode::Lookup => "lookup",
            ProcessorMode::Embedded => "embedded",
        }
    }
}

impl fmt::Display for ProcessorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for [`Consumer`](crate::Consumer).
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub full_document_mode: FullDocumentMode,
    pub batch_size: usize,
    /// Operation kind that belongs to the measured workload.
    pub measured_operation: OperationKind,
    /// Inactivity allowed while seeding before the run fails.
    pub seeding_timeout: Duration,
    /// Inactivity after which the measuring phase is complete.
    pub idle_timeout: Duration,
    /// Upper bound on batches processed concurrently.
    pub max_in_flight_batches: usize,
    /// Extra delay added to every batch's work.
    pub simulated_work: Duration,
}

impl ConsumerConfig {
    /// Config with the two required parameters and defaults for the rest.
    pub fn new(full_document_mode: FullDocumentMode, batch_size: usize) -> Self {
        Self {
            full_document_mode,
            batch_size,
            measured_operation: OperationKind::Update,
            seeding_timeout: DEFAULT_SEEDING_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_in_flight_batches: DEFAULT_MAX_IN_FLIGHT_BATCHES,
            simulated_work: Duration::ZERO,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ClientError::ConfigError("batch_size must be >= 1".into()));
        }
        if self.max_in_flight_batches == 0 {
            return Err(ClientError::ConfigError(
                "max_in_flight_batches must be >= 1".into(),
            ));
        }
        if self.seeding_timeout.is_zero() {
            return Err(ClientError::ConfigError(
                "seeding_timeout must be greater than zero".into(),
            ));
        }
        if self.idle_timeout.is_zero() {
            return Err(ClientError::ConfigError(
                "idle_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for [`WorkloadProducer`](crate::WorkloadProducer).
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Documents inserted during seeding.
    pub documents: usize,
    /// Updates applied after seeding, round-robin over the documents.
    pub updates: usize,
    /// Drop the collection (and emit `drop`) before seeding.
    pub drop_first: bool,
    /// Pause between updates.
    pub update_interval: Duration,
    /// Size of the filler payload in each document, in bytes.
    pub payload_bytes: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            documents: 1_000,
            updates: 10_000,
            drop_first: true,
            update_interval: Duration::ZERO,
            payload_bytes: 64,
        }
    }
}

impl ProducerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.updates > 0 && self.documents == 0 {
            return Err(ClientError::ConfigError(
                "updates require at least one seeded document".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_document_mode_parse() {
        assert_eq!(
            "default".parse::<FullDocumentMode>().unwrap(),
            FullDocumentMode::Default
        );
        assert_eq!(
            "updateLookup".parse::<FullDocumentMode>().unwrap(),
            FullDocumentMode::UpdateLookup
        );
        assert_eq!(
            "update-lookup".parse::<FullDocumentMode>().unwrap(),
            FullDocumentMode::UpdateLookup
        );
        assert!("whenAvailable".parse::<FullDocumentMode>().is_err());
    }

    #[test]
    fn test_full_document_mode_serde_names() {
        let json = serde_json::to_string(&FullDocumentMode::UpdateLookup).unwrap();
        assert_eq!(json, "\"updateLookup\"");
        let mode: FullDocumentMode = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(mode, FullDocumentMode::Default);
    }

    #[test]
    fn test_processor_mode_mapping() {
        assert_eq!(
            FullDocumentMode::Default.processor_mode(),
            ProcessorMode::Lookup
        );
        assert_eq!(
            FullDocumentMode::UpdateLookup.processor_mode(),
            ProcessorMode::Embedded
        );
    }

    #[test]
    fn test_consumer_config_defaults() {
        let config = ConsumerConfig::new(FullDocumentMode::Default, 100);
        assert_eq!(config.measured_operation, OperationKind::Update);
        assert_eq!(config.seeding_timeout, DEFAULT_SEEDING_TIMEOUT);
        assert_eq!(config.idle_timeout, DEFAULT_IDLE_TIMEOUT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_consumer_config_rejects_zero_batch() {
        let config = ConsumerConfig::new(FullDocumentMode::Default, 0);
        assert!(matches!(
            config.validate(),
            Err(ClientError::ConfigError(msg)) if msg.contains("batch_size")
        ));
    }

    #[test]
    fn test_consumer_config_rejects_zero_timeouts() {
        let mut config = ConsumerConfig::new(FullDocumentMode::Default, 1);
        config.idle_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = ConsumerConfig::new(FullDocumentMode::Default, 1);
        config.seeding_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = ConsumerConfig::new(FullDocumentMode::Default, 1);
        config.max_in_flight_batches = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_producer_config_requires_documents_for_updates() {
        let config = ProducerConfig {
            documents: 0,
            updates: 5,
            ..ProducerConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(ProducerConfig::default().validate().is_ok());
    }
}
