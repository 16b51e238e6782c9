use lazy_static::lazy_static;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Once;

static INIT: Once = Once::new();

lazy_static! {
    /// Global Prometheus metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Consumer Metrics
    // ============================================================================

    /// Change events read from the feed
    pub static ref FEED_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("changebench_feed_events_total", "Change events read from the feed"),
        &["operation", "phase"]
    ).expect("metric can be created");

    /// Batches processed, by processor mode and outcome (ok, failed)
    pub static ref BATCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("changebench_batches_total", "Batches processed"),
        &["mode", "outcome"]
    ).expect("metric can be created");

    /// Per-batch processing latency
    pub static ref BATCH_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new("changebench_batch_latency_seconds", "Batch processing latency in seconds")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["mode"]
    ).expect("metric can be created");

    /// Events per processed batch
    pub static ref BATCH_SIZE: Histogram = Histogram::with_opts(
        HistogramOpts::new("changebench_batch_size", "Batch size in events")
            .buckets(vec![1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]),
    ).expect("metric can be created");

    /// Batches currently being processed
    pub static ref IN_FLIGHT_BATCHES: IntGauge = IntGauge::new(
        "changebench_in_flight_batches",
        "Batches currently being processed"
    ).expect("metric can be created");

    /// Current consumer phase (0 seeding, 1 measuring, 2 finalizing, 3 terminated)
    pub static ref CONSUMER_PHASE: IntGauge = IntGauge::new(
        "changebench_consumer_phase",
        "Current consumer phase"
    ).expect("metric can be created");

    // ============================================================================
    // Producer Metrics
    // ============================================================================

    /// Change events emitted by the producer
    pub static ref PRODUCER_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("changebench_producer_events_total", "Change events emitted by the producer"),
        &["operation"]
    ).expect("metric can be created");
}

/// Initialize metrics registry
/// Can be called multiple times safely (idempotent)
pub fn init() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(FEED_EVENTS_TOTAL.clone()))
            .expect("feed_events_total can be registered");
        REGISTRY
            .register(Box::new(BATCHES_TOTAL.clone()))
            .expect("batches_total can be registered");
        REGISTRY
            .register(Box::new(BATCH_LATENCY.clone()))
            .expect("batch_latency can be registered");
        REGISTRY
            .register(Box::new(BATCH_SIZE.clone()))
            .expect("batch_size can be registered");
        REGISTRY
            .register(Box::new(IN_FLIGHT_BATCHES.clone()))
            .expect("in_flight_batches can be registered");
        REGISTRY
            .register(Box::new(CONSUMER_PHASE.clone()))
            .expect("consumer_phase can be registered");
        REGISTRY
            .register(Box::new(PRODUCER_EVENTS_TOTAL.clone()))
            .expect("producer_events_total can be registered");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        init();
        assert!(!REGISTRY.gather().is_empty());
    }

    #[test]
    fn test_feed_event_counter() {
        FEED_EVENTS_TOTAL
            .with_label_values(&["test-op", "seeding"])
            .inc_by(3);

        assert_eq!(
            FEED_EVENTS_TOTAL
                .with_label_values(&["test-op", "seeding"])
                .get(),
            3
        );
    }

    #[test]
    fn test_batch_latency_observation() {
        BATCH_LATENCY.with_label_values(&["test-mode"]).observe(0.002);
        assert_eq!(
            BATCH_LATENCY
                .with_label_values(&["test-mode"])
                .get_sample_count(),
            1
        );
    }
}
