//! changebench Observability
//!
//! Provides metrics and logging for the changebench producer and consumer.
//!
//! # Features
//!
//! - Prometheus metrics for feed events, batches and phase
//! - `/metrics` HTTP exporter
//! - Structured logging with tracing
//!
//! # Usage
//!
//! ```no_run
//! use changebench_observability::{exporter, logging, metrics};
//!
//! logging::init("info");
//! metrics::init();
//!
//! let metrics_router = exporter::create_metrics_router();
//! ```

pub mod exporter;
pub mod logging;
pub mod metrics;

// Re-export commonly used items
pub use metrics::{init as init_metrics, REGISTRY};

/// Initialize metrics and logging with the given default log level.
pub fn init(default_log_level: &str) {
    metrics::init();
    logging::init(default_log_level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_alias() {
        init_metrics();
    }

    #[test]
    fn test_double_init_is_safe() {
        init("warn");
        init("warn");
        let _registry = &*REGISTRY;
    }
}
