//! Per-batch work simulation.
//!
//! The processor does what a real downstream consumer would do with a batch of
//! change events and times it:
//!
//! - **Lookup** (`fullDocument: default`): the events carry only keys, so the
//!   processor resolves the current documents with one bulk keyed lookup. This
//!   is the extra round-trip being benchmarked.
//! - **Embedded** (`fullDocument: updateLookup`): the events already carry the
//!   documents; the processor reads them in place.
//!
//! The latency brackets exactly the chosen work plus any configured simulated
//! delay. A failure never propagates: it is logged and returned inside the
//! [`BatchOutcome`] together with the time spent until the failure.

use crate::batch::Batch;
use crate::config::ProcessorMode;
use crate::error::{ClientError, Result};
use changebench_core::Document;
use changebench_store::DocumentStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Result of processing one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub sequence: u64,
    /// Events in the batch.
    pub events: usize,
    /// Documents resolved (lookup) or consumed (embedded).
    pub documents: usize,
    /// Wall-clock time of the work, up to failure if it failed.
    pub latency: Duration,
    /// Failure message, if the work failed.
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Performs the simulated unit of work for a batch.
#[derive(Clone)]
pub struct Processor {
    mode: ProcessorMode,
    store: Arc<dyn DocumentStore>,
    simulated_work: Duration,
}

impl Processor {
    pub fn new(mode: ProcessorMode, store: Arc<dyn DocumentStore>, simulated_work: Duration) -> Self {
        Self {
            mode,
            store,
            simulated_work,
        }
    }

    pub fn mode(&self) -> ProcessorMode {
        self.mode
    }

    /// Process one batch and report how long it took.
    pub async fn process(&self, batch: &Batch) -> BatchOutcome {
        let start = Instant::now();
        let result = self.work(batch).await;
        let latency = start.elapsed();

        match result {
            Ok(documents) => {
                debug!(
                    sequence = batch.sequence,
                    events = batch.len(),
                    documents,
                    latency_us = latency.as_micros() as u64,
                    mode = %self.mode,
                    "Batch processed"
                );
                BatchOutcome {
                    sequence: batch.sequence,
                    events: batch.len(),
                    documents,
                    latency,
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    sequence = batch.sequence,
                    events = batch.len(),
                    error = %e,
                    mode = %self.mode,
                    "Batch processing failed"
                );
                BatchOutcome {
                    sequence: batch.sequence,
                    events: batch.len(),
                    documents: 0,
                    latency,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn work(&self, batch: &Batch) -> Result<usize> {
        let documents = match self.mode {
            ProcessorMode::Lookup => self.lookup(batch).await?,
            ProcessorMode::Embedded => self.consume_embedded(batch),
        };

        if !self.simulated_work.is_zero() {
            tokio::time::sleep(self.simulated_work).await;
        }

        Ok(documents)
    }

    async fn lookup(&self, batch: &Batch) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let documents = self
            .store
            .find_by_keys(&batch.keys())
            .await
            .map_err(|e| ClientError::ProcessingFailed(e.to_string()))?;

        let weight: usize = documents.iter().map(|d| document_weight(&d.body)).sum();
        std::hint::black_box(weight);

        Ok(documents.len())
    }

    fn consume_embedded(&self, batch: &Batch) -> usize {
        let mut consumed = 0;
        let mut weight = 0;

        for event in &batch.events {
            if let Some(document) = &event.embedded_document {
                weight += document_weight(document);
                consumed += 1;
            }
        }
        std::hint::black_box(weight);

        let missing = batch.len() - consumed;
        if missing > 0 {
            debug!(
                sequence = batch.sequence,
                missing,
                "Events without an embedded document"
            );
        }
        consumed
    }
}

/// Number of JSON nodes in a document; stands in for reading it.
fn document_weight(document: &Document) -> usize {
    match document {
        Document::Array(items) => 1 + items.iter().map(document_weight).sum::<usize>(),
        Document::Object(fields) => 1 + fields.values().map(document_weight).sum::<usize>(),
        _ => 1,
    }
}
