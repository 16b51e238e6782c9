//! `changebench consume`: measure the feed and print the report.

use crate::config::ConsumeSection;
use anyhow::{Context, Result};
use changebench_client::{
    spawn_signal_listener, ClientError, Consumer, ConsumerConfig, FullDocumentMode, NdjsonFeed,
    Report, ShutdownHandle,
};
use changebench_core::OperationKind;
use changebench_store::{DocumentStore, SqliteDocumentStore};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Args)]
pub struct ConsumeArgs {
    /// SQLite database with the documents (needed for fullDocument=default)
    #[arg(long, env = "CHANGEBENCH_STORE")]
    pub store: Option<PathBuf>,

    /// NDJSON feed file, or '-' for stdin
    #[arg(long, env = "CHANGEBENCH_FEED")]
    pub feed: Option<String>,

    /// Full document mode: 'default' or 'updateLookup'
    #[arg(long, env = "CHANGEBENCH_FULL_DOCUMENT")]
    pub full_document: Option<String>,

    /// Measured events per batch
    #[arg(long, env = "CHANGEBENCH_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Operation that makes up the measured workload [default: update]
    #[arg(long, env = "CHANGEBENCH_MEASURED_OPERATION")]
    pub measured_operation: Option<String>,

    /// Seconds without a measured event before seeding fails [default: 300]
    #[arg(long, env = "CHANGEBENCH_SEEDING_TIMEOUT_SECS")]
    pub seeding_timeout_secs: Option<u64>,

    /// Seconds without a measured event before measuring completes [default: 30]
    #[arg(long, env = "CHANGEBENCH_IDLE_TIMEOUT_SECS")]
    pub idle_timeout_secs: Option<u64>,

    /// Batches processed concurrently [default: 4]
    #[arg(long, env = "CHANGEBENCH_MAX_IN_FLIGHT")]
    pub max_in_flight: Option<usize>,

    /// Extra milliseconds of simulated work per batch [default: 0]
    #[arg(long, env = "CHANGEBENCH_SIMULATED_WORK_MS")]
    pub simulated_work_ms: Option<u64>,
}

/// Fully resolved `consume` settings.
#[derive(Debug, Clone)]
pub struct ConsumeSettings {
    pub store: Option<PathBuf>,
    pub feed: String,
    pub config: ConsumerConfig,
}

impl ConsumeArgs {
    /// Merge flags (and environment) over the file section, then defaults.
    pub fn resolve(self, file: &ConsumeSection) -> Result<ConsumeSettings> {
        let full_document = self
            .full_document
            .or_else(|| file.full_document.clone())
            .ok_or_else(|| {
                ClientError::ConfigError(
                    "full document mode is required (--full-document or CHANGEBENCH_FULL_DOCUMENT)"
                        .into(),
                )
            })?
            .parse::<FullDocumentMode>()?;

        let batch_size = self.batch_size.or(file.batch_size).ok_or_else(|| {
            ClientError::ConfigError(
                "batch size is required (--batch-size or CHANGEBENCH_BATCH_SIZE)".into(),
            )
        })?;

        let mut config = ConsumerConfig::new(full_document, batch_size);

        if let Some(op) = self
            .measured_operation
            .or_else(|| file.measured_operation.clone())
        {
            config.measured_operation = OperationKind::parse(&op);
        }
        if let Some(secs) = self.seeding_timeout_secs.or(file.seeding_timeout_secs) {
            config.seeding_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.idle_timeout_secs.or(file.idle_timeout_secs) {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = self.max_in_flight.or(file.max_in_flight) {
            config.max_in_flight_batches = n;
        }
        if let Some(ms) = self.simulated_work_ms.or(file.simulated_work_ms) {
            config.simulated_work = Duration::from_millis(ms);
        }
        config.validate()?;

        Ok(ConsumeSettings {
            store: self.store.or_else(|| file.store.clone()),
            feed: self
                .feed
                .or_else(|| file.feed.clone())
                .unwrap_or_else(|| "-".to_string()),
            config,
        })
    }
}

pub async fn run(settings: ConsumeSettings) -> Result<()> {
    // Opened before the store so a bad feed path leaves nothing to release.
    let feed = NdjsonFeed::open(&settings.feed).await?;

    let store: Option<Arc<dyn DocumentStore>> = match &settings.store {
        Some(path) => {
            let store = SqliteDocumentStore::new(path)
                .await
                .with_context(|| format!("Failed to open store {}", path.display()))?;
            info!(store = %path.display(), "Opened document store");
            Some(Arc::new(store))
        }
        None => None,
    };

    let shutdown = ShutdownHandle::new();
    let listener = spawn_signal_listener(shutdown.clone());

    let result = measure(settings.config, store.clone(), shutdown, feed).await;

    listener.abort();
    if let Some(store) = &store {
        store.close().await;
    }

    let report = result?;
    println!("{}", report);
    Ok(())
}

async fn measure(
    config: ConsumerConfig,
    store: Option<Arc<dyn DocumentStore>>,
    shutdown: ShutdownHandle,
    feed: NdjsonFeed,
) -> changebench_client::Result<Report> {
    let mut builder = Consumer::builder().config(config).shutdown(shutdown);
    if let Some(store) = store {
        builder = builder.store(store);
    }
    builder.build()?.run(feed).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(full_document: Option<&str>, batch_size: Option<usize>) -> ConsumeArgs {
        ConsumeArgs {
            full_document: full_document.map(String::from),
            batch_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_flags_win_over_file() {
        let file = ConsumeSection {
            full_document: Some("default".into()),
            batch_size: Some(50),
            idle_timeout_secs: Some(7),
            ..Default::default()
        };

        let settings = args(Some("updateLookup"), Some(10)).resolve(&file).unwrap();
        assert_eq!(
            settings.config.full_document_mode,
            FullDocumentMode::UpdateLookup
        );
        assert_eq!(settings.config.batch_size, 10);
        assert_eq!(settings.config.idle_timeout, Duration::from_secs(7));
        assert_eq!(settings.feed, "-");
    }

    #[test]
    fn test_file_fills_required_parameters() {
        let file = ConsumeSection {
            full_document: Some("default".into()),
            batch_size: Some(25),
            measured_operation: Some("delete".into()),
            ..Default::default()
        };

        let settings = args(None, None).resolve(&file).unwrap();
        assert_eq!(settings.config.batch_size, 25);
        assert_eq!(settings.config.measured_operation, OperationKind::Delete);
    }

    #[test]
    fn test_missing_required_parameter() {
        let err = args(Some("default"), None)
            .resolve(&ConsumeSection::default())
            .unwrap_err();
        assert!(err.to_string().contains("batch size is required"));

        let err = args(None, Some(3))
            .resolve(&ConsumeSection::default())
            .unwrap_err();
        assert!(err.to_string().contains("full document mode is required"));
    }

    #[tokio::test]
    async fn test_missing_feed_fails_before_opening_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = dir.path().join("bench.db");
        let settings = ConsumeSettings {
            store: Some(store.clone()),
            feed: dir.path().join("absent.ndjson").display().to_string(),
            config: ConsumerConfig::new(FullDocumentMode::Default, 5),
        };

        let err = run(settings).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::FeedConnect(_, _))
        ));
        assert!(!store.exists());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(args(Some("sometimes"), Some(3))
            .resolve(&ConsumeSection::default())
            .is_err());
        assert!(args(Some("default"), Some(0))
            .resolve(&ConsumeSection::default())
            .is_err());
    }
}
