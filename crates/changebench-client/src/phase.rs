//! Phase classification.
//!
//! A benchmark run moves through four phases, never backwards:
//!
//! ```text
//! Seeding ──first measured event──► Measuring ──idle / stop──► Finalizing ──► Terminated
//!    │                                                                          ▲
//!    └──────────────────────── seeding timeout / stop ──────────────────────────┘
//! ```
//!
//! Seeding traffic (inserts, drops, anything that is not the measured
//! operation) is noise. The first event with the measured operation starts
//! the measurement; the consumer records when, in its metrics aggregator.

use changebench_core::{ChangeEvent, OperationKind};
use changebench_observability::metrics::CONSUMER_PHASE;
use std::fmt;
use tracing::info;

/// Process-wide run phase. Ordered by progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Seeding,
    Measuring,
    Finalizing,
    Terminated,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Seeding => "seeding",
            Phase::Measuring => "measuring",
            Phase::Finalizing => "finalizing",
            Phase::Terminated => "terminated",
        }
    }

    fn gauge_value(&self) -> i64 {
        match self {
            Phase::Seeding => 0,
            Phase::Measuring => 1,
            Phase::Finalizing => 2,
            Phase::Terminated => 3,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the classifier decided about one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Non-measured event while seeding.
    SeedingNoise,
    /// The first measured event; the run just entered `Measuring`.
    MeasurementStarted,
    /// A measured event while measuring.
    Measured,
    /// A non-measured event after measurement began.
    Ignored,
    /// Any event once finalization began.
    Discarded,
}

impl Classification {
    /// Whether the event goes on to the batcher.
    pub fn is_measured(&self) -> bool {
        matches!(
            self,
            Classification::MeasurementStarted | Classification::Measured
        )
    }
}

/// Decides which events belong to the measured workload and owns the phase.
#[derive(Debug)]
pub struct PhaseClassifier {
    measured_operation: OperationKind,
    phase: Phase,
}

impl PhaseClassifier {
    pub fn new(measured_operation: OperationKind) -> Self {
        CONSUMER_PHASE.set(Phase::Seeding.gauge_value());
        Self {
            measured_operation,
            phase: Phase::Seeding,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Classify one event, entering `Measuring` on the first measured one.
    pub fn classify(&mut self, event: &ChangeEvent) -> Classification {
        let measured = event.operation == self.measured_operation;

        match (self.phase, measured) {
            (Phase::Seeding, false) => Classification::SeedingNoise,
            (Phase::Seeding, true) => {
                self.advance(Phase::Measuring);
                Classification::MeasurementStarted
            }
            (Phase::Measuring, true) => Classification::Measured,
            (Phase::Measuring, false) => Classification::Ignored,
            (Phase::Finalizing | Phase::Terminated, _) => Classification::Discarded,
        }
    }

    /// Move forward to `next`. Returns false if `next` is not ahead.
    pub fn advance(&mut self, next: Phase) -> bool {
        if next <= self.phase {
            return false;
        }
        info!(from = %self.phase, to = %next, "Phase transition");
        self.phase = next;
        CONSUMER_PHASE.set(next.gauge_value());
        true
    }
}
