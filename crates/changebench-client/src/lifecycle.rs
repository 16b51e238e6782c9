//! Lifecycle control: the seeding and idle-shutdown deadlines.
//!
//! Each deadline is a single `Instant` recomputed on every qualifying event.
//! The consumer sleeps until [`LifecycleController::deadline`] and then asks
//! [`LifecycleController::check_deadline`] whether it really passed, so an
//! event handled between the wake-up and the check always wins.
//!
//! | Phase      | Armed deadline | Re-armed by          | On expiry                |
//! |------------|----------------|----------------------|--------------------------|
//! | Seeding    | seeding        | non-measured events  | fatal `SeedingTimedOut`  |
//! | Measuring  | idle           | measured events      | enter `Finalizing`       |
//! | Finalizing | none           |                      |                          |
//! | Terminated | none           |                      |                          |

use crate::phase::{Classification, Phase, PhaseClassifier};
use changebench_core::{ChangeEvent, OperationKind};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Which deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// No measured event arrived in time. The run failed.
    SeedingTimedOut,
    /// The measured workload went quiet. The run is complete.
    IdleShutdown,
}

/// Owns the run phase and both deadlines.
#[derive(Debug)]
pub struct LifecycleController {
    classifier: PhaseClassifier,
    seeding_timeout: Duration,
    idle_timeout: Duration,
    seeding_deadline: Option<Instant>,
    idle_deadline: Option<Instant>,
}

impl LifecycleController {
    /// Start in `Seeding` with the seeding deadline armed from `now`.
    pub fn new(
        measured_operation: OperationKind,
        seeding_timeout: Duration,
        idle_timeout: Duration,
        now: Instant,
    ) -> Self {
        Self {
            classifier: PhaseClassifier::new(measured_operation),
            seeding_timeout,
            idle_timeout,
            seeding_deadline: Some(now + seeding_timeout),
            idle_deadline: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.classifier.phase()
    }

    pub fn seeding_timeout(&self) -> Duration {
        self.seeding_timeout
    }

    pub fn seeding_deadline(&self) -> Option<Instant> {
        self.seeding_deadline
    }

    pub fn idle_deadline(&self) -> Option<Instant> {
        self.idle_deadline
    }

    /// The deadline governing the current phase, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase() {
            Phase::Seeding => self.seeding_deadline,
            Phase::Measuring => self.idle_deadline,
            Phase::Finalizing | Phase::Terminated => None,
        }
    }

    /// Classify one event and re-arm the deadline it governs.
    pub fn on_event(&mut self, event: &ChangeEvent, now: Instant) -> Classification {
        let classification = self.classifier.classify(event);

        match classification {
            Classification::SeedingNoise => {
                self.seeding_deadline = Some(now + self.seeding_timeout);
            }
            Classification::MeasurementStarted => {
                self.seeding_deadline = None;
                self.idle_deadline = Some(now + self.idle_timeout);
                debug!(idle_timeout = ?self.idle_timeout, "Seeding deadline disarmed, idle deadline armed");
            }
            Classification::Measured => {
                self.idle_deadline = Some(now + self.idle_timeout);
            }
            Classification::Ignored | Classification::Discarded => {}
        }

        classification
    }

    /// Re-arm the idle deadline from `now` once a measured event is fully
    /// handled.
    ///
    /// Handling can wait for a free batch slot; the idle window starts after
    /// that wait, not when the event was read.
    pub fn touch(&mut self, now: Instant) {
        if self.phase() == Phase::Measuring {
            self.idle_deadline = Some(now + self.idle_timeout);
        }
    }

    /// Check the current deadline against `now`.
    ///
    /// Returns `None` when nothing expired (including a wake-up whose deadline
    /// was pushed back by an event in the meantime).
    pub fn check_deadline(&mut self, now: Instant) -> Option<Expiry> {
        match self.phase() {
            Phase::Seeding if self.seeding_deadline.is_some_and(|d| now >= d) => {
                self.seeding_deadline = None;
                warn!(
                    seeding_timeout = ?self.seeding_timeout,
                    "Seeding deadline expired before any measured event"
                );
                self.classifier.advance(Phase::Terminated);
                Some(Expiry::SeedingTimedOut)
            }
            Phase::Measuring if self.idle_deadline.is_some_and(|d| now >= d) => {
                self.idle_deadline = None;
                debug!(idle_timeout = ?self.idle_timeout, "Idle deadline expired");
                self.classifier.advance(Phase::Finalizing);
                Some(Expiry::IdleShutdown)
            }
            _ => None,
        }
    }

    /// Explicit stop or end-of-feed. Disarms both deadlines.
    ///
    /// Returns the phase the run was in. From `Measuring` the run enters
    /// `Finalizing`; from `Seeding` it terminates without measuring.
    pub fn stop(&mut self) -> Phase {
        let previous = self.phase();
        self.seeding_deadline = None;
        self.idle_deadline = None;

        match previous {
            Phase::Measuring => {
                self.classifier.advance(Phase::Finalizing);
            }
            Phase::Seeding => {
                self.classifier.advance(Phase::Terminated);
            }
            Phase::Finalizing | Phase::Terminated => {}
        }
        previous
    }

    /// Mark the run as finished. `Terminated` is absorbing.
    pub fn terminate(&mut self) {
        self.seeding_deadline = None;
        self.idle_deadline = None;
        self.classifier.advance(Phase::Terminated);
    }
}
