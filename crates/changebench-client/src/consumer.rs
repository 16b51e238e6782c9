//! Change feed consumer.
//!
//! The consumer is one pull loop. Each turn it races three things and acts on
//! whichever is ready first:
//!
//! ```text
//!                ┌──────────────┐
//!   stop ───────►│              │
//!   next event ─►│   select!    │──► classify ──► batch ──► spawn processing
//!   deadline ───►│              │
//!                └──────┬───────┘
//!                       │ idle expiry / end-of-feed / stop
//!                       ▼
//!             drain partial batch, await in-flight batches, snapshot
//! ```
//!
//! Deadlines are owned by the [`LifecycleController`]. A wake-up from the
//! deadline branch does nothing by itself; the next turn re-checks the
//! deadline against the clock, so an event that re-armed it in the meantime
//! always wins. A measured event re-arms the idle deadline again once it has
//! been handed to the pipeline, so time spent waiting for a batch slot never
//! counts as idleness.
//!
//! Batch processing runs in spawned tasks so ingestion continues while a
//! batch is being processed. At most `max_in_flight_batches` run at once;
//! when the bound is reached, ingestion waits for a slot.
//!
//! ## Example
//!
//! ```ignore
//! let consumer = Consumer::builder()
//!     .config(ConsumerConfig::new(FullDocumentMode::Default, 100))
//!     .store(store)
//!     .build()?;
//!
//! let feed = NdjsonFeed::open("-").await?;
//! let report = consumer.run(feed).await?;
//! println!("{}", report);
//! ```

use crate::batch::{Batch, Batcher};
use crate::config::{ConsumerConfig, ProcessorMode};
use crate::error::{ClientError, Result};
use crate::feed::{apply_full_document_mode, EventFeed};
use crate::lifecycle::{Expiry, LifecycleController};
use crate::metrics::MetricsAggregator;
use crate::phase::{Classification, Phase};
use crate::processor::Processor;
use crate::report::Report;
use crate::shutdown::ShutdownHandle;
use changebench_core::ChangeEvent;
use changebench_observability::metrics::{FEED_EVENTS_TOTAL, IN_FLIGHT_BATCHES};
use changebench_store::{DocumentStore, MemoryDocumentStore};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs one benchmark measurement over a change feed.
pub struct Consumer {
    config: ConsumerConfig,
    processor: Processor,
    shutdown: ShutdownHandle,
}

/// Builder for [`Consumer`].
pub struct ConsumerBuilder {
    config: Option<ConsumerConfig>,
    store: Option<Arc<dyn DocumentStore>>,
    shutdown: Option<ShutdownHandle>,
}

impl ConsumerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            shutdown: None,
        }
    }

    /// Set the run configuration. Required.
    pub fn config(mut self, config: ConsumerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document store used for bulk lookups.
    ///
    /// Required when the full document mode is `default`.
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Stop the run when this handle is triggered.
    pub fn shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn build(self) -> Result<Consumer> {
        let config = self
            .config
            .ok_or_else(|| ClientError::ConfigError("consumer config required".into()))?;
        config.validate()?;

        let mode = config.full_document_mode.processor_mode();
        let store: Arc<dyn DocumentStore> = match (self.store, mode) {
            (Some(store), _) => store,
            (None, ProcessorMode::Embedded) => Arc::new(MemoryDocumentStore::new()),
            (None, ProcessorMode::Lookup) => {
                return Err(ClientError::ConfigError(
                    "document store required when fullDocument is 'default'".into(),
                ))
            }
        };

        Ok(Consumer {
            processor: Processor::new(mode, store, config.simulated_work),
            config,
            shutdown: self.shutdown.unwrap_or_default(),
        })
    }
}

impl Default for ConsumerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Batching and concurrent batch processing for one run.
struct Pipeline {
    batcher: Batcher,
    processor: Processor,
    metrics: Arc<MetricsAggregator>,
    slots: Arc<Semaphore>,
    in_flight: JoinSet<()>,
}

impl Pipeline {
    fn new(config: &ConsumerConfig, processor: Processor) -> Self {
        Self {
            batcher: Batcher::new(config.batch_size),
            processor,
            metrics: Arc::new(MetricsAggregator::new()),
            slots: Arc::new(Semaphore::new(config.max_in_flight_batches)),
            in_flight: JoinSet::new(),
        }
    }

    /// Add a measured event, dispatching the batch once it is full.
    async fn accept(&mut self, event: ChangeEvent) -> Result<()> {
        if self.batcher.accept(event) {
            let batch = self.batcher.drain();
            self.dispatch(batch).await?;
        }
        Ok(())
    }

    /// Hand a batch to the processor in a task of its own.
    ///
    /// Waits for a free slot first, so batches start in dispatch order.
    async fn dispatch(&mut self, batch: Batch) -> Result<()> {
        self.reap_finished();

        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ClientError::Internal(format!("batch slots closed: {}", e)))?;

        let processor = self.processor.clone();
        let metrics = Arc::clone(&self.metrics);
        IN_FLIGHT_BATCHES.inc();

        self.in_flight.spawn(async move {
            let outcome = processor.process(&batch).await;
            metrics.record_outcome(&outcome, processor.mode());
            IN_FLIGHT_BATCHES.dec();
            drop(permit);
        });
        Ok(())
    }

    /// Dispatch whatever is buffered, even a partial batch.
    async fn flush(&mut self) -> Result<()> {
        if self.batcher.is_empty() {
            return Ok(());
        }
        let batch = self.batcher.drain();
        info!(
            sequence = batch.sequence,
            events = batch.len(),
            "Flushing partial batch"
        );
        self.dispatch(batch).await
    }

    fn reap_finished(&mut self) {
        while let Some(result) = self.in_flight.try_join_next() {
            log_join_result(result);
        }
    }

    /// Wait for every dispatched batch to finish.
    async fn wait_in_flight(&mut self) {
        if !self.in_flight.is_empty() {
            debug!(in_flight = self.in_flight.len(), "Waiting for in-flight batches");
        }
        while let Some(result) = self.in_flight.join_next().await {
            log_join_result(result);
        }
    }
}

fn log_join_result(result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Batch task did not complete; its batch is not recorded");
        IN_FLIGHT_BATCHES.dec();
    }
}

impl Consumer {
    /// Create a builder.
    pub fn builder() -> ConsumerBuilder {
        ConsumerBuilder::new()
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// A handle that stops this consumer's runs.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Consume `feed` until the measurement completes and return the report.
    ///
    /// The feed is closed exactly once, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`ClientError::SeedingTimeout`] if no measured event arrives in time
    /// - [`ClientError::FeedClosed`] if the feed ends before measurement
    /// - [`ClientError::Interrupted`] if stopped before measurement
    /// - [`ClientError::FeedTransport`] if the feed fails mid-stream
    pub async fn run<F>(&self, mut feed: F) -> Result<Report>
    where
        F: EventFeed,
    {
        let mut lifecycle = LifecycleController::new(
            self.config.measured_operation.clone(),
            self.config.seeding_timeout,
            self.config.idle_timeout,
            Instant::now(),
        );
        let mut pipeline = Pipeline::new(&self.config, self.processor.clone());

        info!(
            feed = %feed.name(),
            full_document = %self.config.full_document_mode,
            batch_size = self.config.batch_size,
            measured_operation = %self.config.measured_operation,
            "Consumer started, waiting for the measured workload"
        );

        let result = self.drive(&mut feed, &mut lifecycle, &mut pipeline).await;

        feed.close().await;
        lifecycle.terminate();

        match &result {
            Ok(report) => info!(
                processed_events = report.metrics.processed_events,
                batches = report.metrics.batch_count,
                "Consumer finished"
            ),
            Err(e) => error!(error = %e, "Consumer failed"),
        }
        result
    }

    async fn drive<F>(
        &self,
        feed: &mut F,
        lifecycle: &mut LifecycleController,
        pipeline: &mut Pipeline,
    ) -> Result<Report>
    where
        F: EventFeed,
    {
        let mut shutdown = self.shutdown.clone();

        loop {
            match lifecycle.check_deadline(Instant::now()) {
                Some(Expiry::SeedingTimedOut) => {
                    return Err(ClientError::SeedingTimeout(lifecycle.seeding_timeout()));
                }
                Some(Expiry::IdleShutdown) => {
                    info!(
                        idle_timeout = ?self.config.idle_timeout,
                        "No measured events within the idle window, finalizing"
                    );
                    break;
                }
                None => {}
            }

            let deadline = lifecycle.deadline();

            tokio::select! {
                biased;

                signal = shutdown.wait() => {
                    info!(%signal, phase = %lifecycle.phase(), "Stop requested");
                    if lifecycle.stop() == Phase::Seeding {
                        return Err(ClientError::Interrupted);
                    }
                    break;
                }

                next = feed.next_event() => match next {
                    Ok(Some(event)) => self.handle_event(event, lifecycle, pipeline).await?,
                    Ok(None) => {
                        info!(phase = %lifecycle.phase(), "Event feed ended");
                        if lifecycle.stop() == Phase::Seeding {
                            return Err(ClientError::FeedClosed);
                        }
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Event feed failed, no reconnection is attempted");
                        pipeline.wait_in_flight().await;
                        return Err(e);
                    }
                },

                _ = sleep_until(deadline) => {}
            }
        }

        let finalized_at = Instant::now();
        pipeline.flush().await?;
        pipeline.wait_in_flight().await;

        Ok(Report {
            full_document_mode: self.config.full_document_mode,
            batch_size: self.config.batch_size,
            measured_operation: self.config.measured_operation.clone(),
            metrics: pipeline.metrics.snapshot(finalized_at),
        })
    }

    async fn handle_event(
        &self,
        mut event: ChangeEvent,
        lifecycle: &mut LifecycleController,
        pipeline: &mut Pipeline,
    ) -> Result<()> {
        apply_full_document_mode(self.config.full_document_mode, &mut event);

        let now = Instant::now();
        let classification = lifecycle.on_event(&event, now);

        FEED_EVENTS_TOTAL
            .with_label_values(&[event.operation.as_str(), lifecycle.phase().as_str()])
            .inc();

        if classification == Classification::MeasurementStarted {
            pipeline.metrics.mark_measurement_start(now);
            info!(
                operation = %event.operation,
                "First measured event, measurement started"
            );
        }
        if !classification.is_measured() {
            return Ok(());
        }

        pipeline.accept(event).await?;
        // Time spent waiting for a batch slot is not idle time.
        lifecycle.touch(Instant::now());
        Ok(())
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
