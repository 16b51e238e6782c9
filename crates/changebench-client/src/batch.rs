//! Batching Logic for the changebench Consumer
//!
//! Measured change events are accumulated in arrival order until the batch
//! reaches `batch_size`, then handed to the processor as one unit of work.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  measured event  │ from the phase classifier
//! └────────┬─────────┘
//!          │ accept()
//!          ▼
//! ┌──────────────────────────────┐
//! │  Batcher                     │
//! │  - events: Vec<ChangeEvent>  │
//! │  - next_sequence: u64        │
//! │  - started_at: Instant       │
//! └────────┬─────────────────────┘
//!          │
//!          ├─→ Flush when full (accept() returned true)
//!          ├─→ Flush the partial batch at finalization
//!          │
//!          ▼
//! ┌──────────────────────────────┐
//! │  Batch { sequence, events }  │ to the processor
//! └──────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! The Batcher is owned by the consumer loop and mutated through `&mut self`,
//! so `drain` cannot interleave with `accept`. A drained [`Batch`] is owned
//! outright by whoever processes it.

use changebench_core::{ChangeEvent, DocumentKey};
use tokio::time::{Duration, Instant};
use tracing::{debug, trace};

/// An ordered group of measured events processed as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Position of this batch in flush order, starting at 0.
    pub sequence: u64,
    /// Events in feed order.
    pub events: Vec<ChangeEvent>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Document keys in event order (duplicates kept).
    pub fn keys(&self) -> Vec<DocumentKey> {
        self.events.iter().map(|e| e.document_key.clone()).collect()
    }
}

/// Accumulates measured events into bounded, ordered batches.
///
/// # Examples
///
/// ```ignore
/// let mut batcher = Batcher::new(100);
///
/// if batcher.accept(event) {
///     let batch = batcher.drain();
///     // ... hand to the processor ...
/// }
/// ```
#[derive(Debug)]
pub struct Batcher {
    /// Buffered events
    events: Vec<ChangeEvent>,

    /// Maximum number of events per batch
    batch_size: usize,

    /// Sequence number the next drained batch gets
    next_sequence: u64,

    /// When the current batch received its first event
    started_at: Option<Instant>,
}

impl Batcher {
    /// Create an empty batcher.
    ///
    /// `batch_size` is clamped to at least 1.
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            events: Vec::with_capacity(batch_size),
            batch_size,
            next_sequence: 0,
            started_at: None,
        }
    }

    /// Append an event. Returns `true` when the batch is now full.
    ///
    /// A full batch must be drained before the next `accept`.
    pub fn accept(&mut self, event: ChangeEvent) -> bool {
        if self.events.is_empty() {
            self.started_at = Some(Instant::now());
        }
        self.events.push(event);
        trace!(
            buffered = self.events.len(),
            batch_size = self.batch_size,
            "Accepted event into batch"
        );
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.batch_size
    }

    /// Remove and return the buffered events as a batch, possibly empty.
    ///
    /// # Side Effects
    ///
    /// - Resets the buffer to empty
    /// - Advances the sequence number
    pub fn drain(&mut self) -> Batch {
        let events = std::mem::replace(&mut self.events, Vec::with_capacity(self.batch_size));
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        debug!(
            sequence,
            event_count = events.len(),
            fill_ms = self.age().as_millis() as u64,
            "Drained batch"
        );
        self.started_at = None;

        Batch { sequence, events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Time since the current batch received its first event.
    pub fn age(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use changebench_core::OperationKind;

    fn event(key: &str) -> ChangeEvent {
        ChangeEvent::new(OperationKind::Update, DocumentKey::from(key))
    }

    #[test]
    fn test_accept_reports_full() {
        let mut batcher = Batcher::new(2);
        assert!(!batcher.accept(event("a")));
        assert!(batcher.accept(event("b")));
        assert!(batcher.is_full());
    }

    #[test]
    fn test_drain_preserves_order_and_resets() {
        let mut batcher = Batcher::new(3);
        batcher.accept(event("a"));
        batcher.accept(event("b"));
        batcher.accept(event("c"));

        let batch = batcher.drain();
        assert_eq!(batch.sequence, 0);
        let keys: Vec<&str> = batch.events.iter().map(|e| e.document_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert!(batcher.is_empty());
        assert_eq!(batcher.age(), Duration::ZERO);
    }

    #[test]
    fn test_sequence_advances_per_drain() {
        let mut batcher = Batcher::new(1);
        batcher.accept(event("a"));
        assert_eq!(batcher.drain().sequence, 0);
        batcher.accept(event("b"));
        assert_eq!(batcher.drain().sequence, 1);
        assert_eq!(batcher.drain().sequence, 2);
    }

    #[test]
    fn test_drain_empty_batch() {
        let mut batcher = Batcher::new(5);
        let batch = batcher.drain();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_zero_batch_size_clamped() {
        let mut batcher = Batcher::new(0);
        assert_eq!(batcher.batch_size(), 1);
        assert!(batcher.accept(event("a")));
    }

    #[test]
    fn test_full_batches_and_remainder() {
        for batch_size in 1..=7usize {
            for n in 0..=25usize {
                let mut batcher = Batcher::new(batch_size);
                let mut flushed = Vec::new();

                for i in 0..n {
                    if batcher.accept(event(&i.to_string())) {
                        flushed.push(batcher.drain());
                    }
                }

                assert_eq!(flushed.len(), n / batch_size, "b={batch_size} n={n}");
                assert!(flushed.iter().all(|b| b.len() == batch_size));
                assert_eq!(batcher.len(), n % batch_size, "b={batch_size} n={n}");
            }
        }
    }

    #[test]
    fn test_batch_keys() {
        let mut batcher = Batcher::new(3);
        batcher.accept(event("k1"));
        batcher.accept(event("k2"));
        batcher.accept(event("k1"));
        let keys = batcher.drain().keys();
        assert_eq!(
            keys,
            vec![
                DocumentKey::from("k1"),
                DocumentKey::from("k2"),
                DocumentKey::from("k1")
            ]
        );
    }
}
