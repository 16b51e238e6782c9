//! Human-readable benchmark report.
//!
//! Printed to stdout once, after finalization. The line order is fixed so the
//! output can be grepped or diffed between runs:
//!
//! ```text
//! === changebench report start ===
//! scenario: fullDocument=default batchSize=100 measuredOperation=update
//! processed events: 10000
//! elapsed: 4.210 s
//! throughput: 2375.30 events/sec
//! average batch latency: 1.482 ms
//! batches: 100 (failed: 0)
//! === changebench report end ===
//! ```

use crate::config::FullDocumentMode;
use crate::metrics::MetricsSnapshot;
use changebench_core::OperationKind;
use std::fmt;

pub const REPORT_START_MARKER: &str = "=== changebench report start ===";
pub const REPORT_END_MARKER: &str = "=== changebench report end ===";

/// Scenario parameters plus the final metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub full_document_mode: FullDocumentMode,
    pub batch_size: usize,
    pub measured_operation: OperationKind,
    pub metrics: MetricsSnapshot,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        writeln!(f, "{}", REPORT_START_MARKER)?;
        writeln!(
            f,
            "scenario: fullDocument={} batchSize={} measuredOperation={}",
            self.full_document_mode, self.batch_size, self.measured_operation
        )?;
        writeln!(f, "processed events: {}", m.processed_events)?;
        writeln!(f, "elapsed: {:.3} s", m.elapsed.as_secs_f64())?;
        writeln!(f, "throughput: {:.2} events/sec", m.throughput)?;
        writeln!(
            f,
            "average batch latency: {:.3} ms",
            m.average_batch_latency.as_secs_f64() * 1_000.0
        )?;
        writeln!(
            f,
            "batches: {} (failed: {})",
            m.batch_count, m.failed_batch_count
        )?;
        write!(f, "{}", REPORT_END_MARKER)
    }
}
