//! Metrics aggregation for the measured workload.
//!
//! [`MetricsAggregator`] is the single aggregation point for the report. Batch
//! tasks finish out of order and record concurrently, so every counter is an
//! atomic and recording is commutative: the final snapshot only depends on the
//! set of recorded batches, never on their completion order.
//!
//! Two figures answer two different questions and are deliberately kept apart:
//!
//! - **Throughput** is processed events over wall-clock measurement time, from
//!   the first measured event to finalization.
//! - **Average batch latency** is the summed per-batch work time over the
//!   number of batches.
//!
//! Deriving throughput from summed latencies would hide the time events spend
//! buffered while a batch fills.

use crate::config::ProcessorMode;
use crate::processor::BatchOutcome;
use changebench_observability::metrics::{BATCHES_TOTAL, BATCH_LATENCY, BATCH_SIZE};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Accumulates processed events and batch latencies.
///
/// Shared as `Arc<MetricsAggregator>` between the consumer loop and its batch
/// tasks.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    processed_events: AtomicU64,
    total_latency_nanos: AtomicU64,
    batch_count: AtomicU64,
    failed_batch_count: AtomicU64,
    measurement_start: OnceLock<Instant>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the measurement start. Only the first call has an effect.
    pub fn mark_measurement_start(&self, at: Instant) -> bool {
        self.measurement_start.set(at).is_ok()
    }

    pub fn measurement_start(&self) -> Option<Instant> {
        self.measurement_start.get().copied()
    }

    /// Record one processed batch.
    pub fn record(&self, batch_size: usize, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);

        self.processed_events
            .fetch_add(batch_size as u64, Ordering::Relaxed);
        self.total_latency_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.batch_count.fetch_add(1, Ordering::Relaxed);

        trace!(batch_size, latency_us = latency.as_micros() as u64, "Recorded batch");
    }

    /// Record a processor outcome, failed or not, and mirror it to Prometheus.
    ///
    /// A failed batch still counts its events and the time spent until the
    /// failure, and is also tallied separately.
    pub fn record_outcome(&self, outcome: &BatchOutcome, mode: ProcessorMode) {
        self.record(outcome.events, outcome.latency);

        let status = if outcome.is_ok() {
            "ok"
        } else {
            self.failed_batch_count.fetch_add(1, Ordering::Relaxed);
            "failed"
        };

        BATCHES_TOTAL
            .with_label_values(&[mode.as_str(), status])
            .inc();
        BATCH_LATENCY
            .with_label_values(&[mode.as_str()])
            .observe(outcome.latency.as_secs_f64());
        BATCH_SIZE.observe(outcome.events as f64);
    }

    pub fn processed_events(&self) -> u64 {
        self.processed_events.load(Ordering::Relaxed)
    }

    pub fn batch_count(&self) -> u64 {
        self.batch_count.load(Ordering::Relaxed)
    }

    pub fn failed_batch_count(&self) -> u64 {
        self.failed_batch_count.load(Ordering::Relaxed)
    }

    pub fn total_latency(&self) -> Duration {
        Duration::from_nanos(self.total_latency_nanos.load(Ordering::Relaxed))
    }

    /// Freeze the counters as of `finalized_at`.
    ///
    /// Without a measurement start the elapsed time is zero.
    pub fn snapshot(&self, finalized_at: Instant) -> MetricsSnapshot {
        let elapsed = self
            .measurement_start()
            .map(|start| finalized_at.saturating_duration_since(start))
            .unwrap_or_default();

        MetricsSnapshot::compute(
            self.processed_events(),
            self.total_latency(),
            self.batch_count(),
            self.failed_batch_count(),
            elapsed,
        )
    }
}

/// Final, immutable view of the measured workload.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub processed_events: u64,
    pub batch_count: u64,
    pub failed_batch_count: u64,
    pub total_batch_latency: Duration,
    /// Wall-clock time from measurement start to finalization.
    pub elapsed: Duration,
    /// Events per second over `elapsed`; 0 when `elapsed` is zero.
    pub throughput: f64,
    /// `total_batch_latency / batch_count`; zero when no batch was recorded.
    pub average_batch_latency: Duration,
}

impl MetricsSnapshot {
    pub fn compute(
        processed_events: u64,
        total_batch_latency: Duration,
        batch_count: u64,
        failed_batch_count: u64,
        elapsed: Duration,
    ) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if elapsed_secs > 0.0 {
            processed_events as f64 / elapsed_secs
        } else {
            0.0
        };

        let average_batch_latency = if batch_count == 0 {
            Duration::ZERO
        } else {
            let nanos = total_batch_latency.as_nanos() / u128::from(batch_count);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        };

        Self {
            processed_events,
            batch_count,
            failed_batch_count,
            total_batch_latency,
            elapsed,
            throughput,
            average_batch_latency,
        }
    }
}
