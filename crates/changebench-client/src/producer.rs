//! Workload producer.
//!
//! Generates the traffic the consumer measures. A run has three stages, each
//! mirrored to the store and to an [`EventSink`] as change events:
//!
//! 1. **Drop** (optional): clear the collection, emit one `drop`
//! 2. **Seed**: insert `documents` documents, emit one `insert` each
//! 3. **Update**: `updates` round-robin updates, emit one `update` each
//!
//! Every event carries the full document. The consumer's feed adapter decides
//! whether it keeps it.

use crate::config::ProducerConfig;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use changebench_core::{wire, ChangeEvent, Document, DocumentKey, OperationKind};
use changebench_observability::metrics::PRODUCER_EVENTS_TOTAL;
use changebench_store::{DocumentStore, StoredDocument};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

/// Destination for produced change events.
#[async_trait]
pub trait EventSink: Send {
    /// Emit one event.
    async fn send(&mut self, event: &ChangeEvent) -> Result<()>;

    /// Flush and end the stream.
    async fn finish(&mut self) -> Result<()>;
}

/// Writes events as newline-delimited JSON.
pub struct NdjsonSink<W> {
    writer: BufWriter<W>,
}

impl<W> NdjsonSink<W>
where
    W: AsyncWrite + Send + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> EventSink for NdjsonSink<W>
where
    W: AsyncWrite + Send + Unpin,
{
    async fn send(&mut self, event: &ChangeEvent) -> Result<()> {
        let mut line = wire::encode_line(event).map_err(|e| ClientError::SinkError(e.to_string()))?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ClientError::SinkError(e.to_string()))
    }

    async fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .await
            .map_err(|e| ClientError::SinkError(e.to_string()))
    }
}

/// Pushes events into a channel, typically read by a
/// [`ChannelFeed`](crate::feed::ChannelFeed).
pub struct ChannelSink {
    sender: Option<mpsc::Sender<Result<ChangeEvent>>>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<Result<ChangeEvent>>) -> Self {
        Self {
            sender: Some(sender),
        }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn send(&mut self, event: &ChangeEvent) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| ClientError::SinkError("sink already finished".into()))?;
        sender
            .send(Ok(event.clone()))
            .await
            .map_err(|_| ClientError::SinkError("receiver dropped".into()))
    }

    /// Drops the sender so the receiving feed sees end-of-feed.
    async fn finish(&mut self) -> Result<()> {
        self.sender.take();
        Ok(())
    }
}

/// Counts from a completed producer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceSummary {
    pub dropped: bool,
    pub seeded: usize,
    pub updated: usize,
    pub elapsed: Duration,
}

/// Seeds and mutates documents, emitting a change event for each mutation.
pub struct WorkloadProducer {
    config: ProducerConfig,
    store: Arc<dyn DocumentStore>,
}

impl WorkloadProducer {
    pub fn new(config: ProducerConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// Run all stages and finish the sink.
    pub async fn produce<S>(&self, sink: &mut S) -> Result<ProduceSummary>
    where
        S: EventSink + ?Sized,
    {
        let start = Instant::now();

        if self.config.drop_first {
            self.store.drop_collection().await?;
            emit(sink, ChangeEvent::new(OperationKind::Drop, DocumentKey::from("*"))).await?;
            info!("Collection dropped");
        }

        let mut documents = Vec::with_capacity(self.config.documents);
        for index in 0..self.config.documents {
            let key = document_key(index);
            let body = self.initial_document(&key);

            self.store
                .insert(StoredDocument::new(key.clone(), body.clone()))
                .await?;
            emit(
                sink,
                ChangeEvent::new(OperationKind::Insert, key.clone()).with_document(body.clone()),
            )
            .await?;
            documents.push((key, body));
        }
        info!(documents = documents.len(), "Seeding complete");

        for n in 0..self.config.updates {
            if n > 0 && !self.config.update_interval.is_zero() {
                tokio::time::sleep(self.config.update_interval).await;
            }

            let slot = n % documents.len();
            let (key, body) = &mut documents[slot];
            bump(body);

            self.store.update(key, body.clone()).await?;
            emit(
                sink,
                ChangeEvent::new(OperationKind::Update, key.clone()).with_document(body.clone()),
            )
            .await?;

            if (n + 1) % 1_000 == 0 {
                debug!(updated = n + 1, total = self.config.updates, "Update progress");
            }
        }

        sink.finish().await?;

        let summary = ProduceSummary {
            dropped: self.config.drop_first,
            seeded: documents.len(),
            updated: self.config.updates,
            elapsed: start.elapsed(),
        };
        info!(
            seeded = summary.seeded,
            updated = summary.updated,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Workload complete"
        );
        Ok(summary)
    }

    fn initial_document(&self, key: &DocumentKey) -> Document {
        let now = chrono::Utc::now().to_rfc3339();
        json!({
            "_id": key.as_str(),
            "version": 0,
            "counter": 0,
            "payload": "x".repeat(self.config.payload_bytes),
            "createdAt": now,
            "updatedAt": now,
        })
    }
}

fn document_key(index: usize) -> DocumentKey {
    DocumentKey::new(format!("doc-{}", index))
}

/// Apply one update: increment `version` and `counter`, stamp `updatedAt`.
fn bump(body: &mut Document) {
    for field in ["version", "counter"] {
        let next = body.get(field).and_then(|v| v.as_u64()).unwrap_or(0) + 1;
        body[field] = json!(next);
    }
    body["updatedAt"] = json!(chrono::Utc::now().to_rfc3339());
}

async fn emit<S>(sink: &mut S, event: ChangeEvent) -> Result<()>
where
    S: EventSink + ?Sized,
{
    sink.send(&event).await?;
    PRODUCER_EVENTS_TOTAL
        .with_label_values(&[event.operation.as_str()])
        .inc();
    Ok(())
}
