//! `changebench produce`: seed and update documents, writing the change feed.

use crate::config::ProduceSection;
use anyhow::{Context, Result};
use changebench_client::{ClientError, NdjsonSink, ProducerConfig, WorkloadProducer};
use changebench_store::{DocumentStore, SqliteDocumentStore};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tracing::info;

#[derive(Debug, Default, Args)]
pub struct ProduceArgs {
    /// SQLite database to seed and update
    #[arg(long, env = "CHANGEBENCH_STORE")]
    pub store: Option<PathBuf>,

    /// Where to write the NDJSON feed, '-' for stdout [default: -]
    #[arg(long, env = "CHANGEBENCH_OUT")]
    pub out: Option<String>,

    /// Documents to insert while seeding [default: 1000]
    #[arg(long, env = "CHANGEBENCH_DOCUMENTS")]
    pub documents: Option<usize>,

    /// Updates to apply after seeding [default: 10000]
    #[arg(long, env = "CHANGEBENCH_UPDATES")]
    pub updates: Option<usize>,

    /// Drop the collection before seeding [default: true]
    #[arg(long, env = "CHANGEBENCH_DROP_FIRST")]
    pub drop_first: Option<bool>,

    /// Milliseconds to wait between updates [default: 0]
    #[arg(long, env = "CHANGEBENCH_UPDATE_INTERVAL_MS")]
    pub update_interval_ms: Option<u64>,

    /// Filler bytes per document [default: 64]
    #[arg(long, env = "CHANGEBENCH_PAYLOAD_BYTES")]
    pub payload_bytes: Option<usize>,
}

/// Fully resolved `produce` settings.
#[derive(Debug, Clone)]
pub struct ProduceSettings {
    pub store: PathBuf,
    pub out: String,
    pub config: ProducerConfig,
}

impl ProduceArgs {
    pub fn resolve(self, file: &ProduceSection) -> Result<ProduceSettings> {
        let store = self.store.or_else(|| file.store.clone()).ok_or_else(|| {
            ClientError::ConfigError("store is required (--store or CHANGEBENCH_STORE)".into())
        })?;

        let defaults = ProducerConfig::default();
        let config = ProducerConfig {
            documents: self.documents.or(file.documents).unwrap_or(defaults.documents),
            updates: self.updates.or(file.updates).unwrap_or(defaults.updates),
            drop_first: self
                .drop_first
                .or(file.drop_first)
                .unwrap_or(defaults.drop_first),
            update_interval: self
                .update_interval_ms
                .or(file.update_interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.update_interval),
            payload_bytes: self
                .payload_bytes
                .or(file.payload_bytes)
                .unwrap_or(defaults.payload_bytes),
        };
        config.validate()?;

        Ok(ProduceSettings {
            store,
            out: self
                .out
                .or_else(|| file.out.clone())
                .unwrap_or_else(|| "-".to_string()),
            config,
        })
    }
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub async fn run(settings: ProduceSettings) -> Result<()> {
    let store = SqliteDocumentStore::new(&settings.store)
        .await
        .with_context(|| format!("Failed to open store {}", settings.store.display()))?;
    let store = Arc::new(store);

    let writer: BoxedWriter = if settings.out == "-" {
        Box::new(tokio::io::stdout())
    } else {
        let file = tokio::fs::File::create(&settings.out)
            .await
            .with_context(|| format!("Failed to create feed file {}", settings.out))?;
        Box::new(file)
    };

    let producer = WorkloadProducer::new(settings.config, store.clone())?;
    let mut sink = NdjsonSink::new(writer);
    let result = producer.produce(&mut sink).await;
    store.close().await;

    let summary = result?;
    info!(
        out = %settings.out,
        seeded = summary.seeded,
        updated = summary.updated,
        "Feed written"
    );
    Ok(())
}
