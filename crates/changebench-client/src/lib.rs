//! changebench Client - Change Feed Consumer and Workload Producer
//!
//! This crate measures how fast a change feed consumer processes the measured
//! workload, with and without full documents embedded in the events. It
//! contains the consumer pipeline (phase classification, lifecycle deadlines,
//! batching, per-batch processing, metrics) and the producer that generates
//! the workload.
//!
//! # Examples
//!
//! ## Consumer
//!
//! ```ignore
//! use changebench_client::{Consumer, ConsumerConfig, FullDocumentMode, NdjsonFeed};
//!
//! let consumer = Consumer::builder()
//!     .config(ConsumerConfig::new(FullDocumentMode::Default, 100))
//!     .store(store)
//!     .build()?;
//!
//! let report = consumer.run(NdjsonFeed::open("-").await?).await?;
//! println!("{}", report);
//! ```
//!
//! ## Producer
//!
//! ```ignore
//! use changebench_client::{NdjsonSink, ProducerConfig, WorkloadProducer};
//!
//! let producer = WorkloadProducer::new(ProducerConfig::default(), store)?;
//! let mut sink = NdjsonSink::new(tokio::io::stdout());
//! producer.produce(&mut sink).await?;
//! ```

pub mod batch;
pub mod config;
pub mod consumer;
pub mod error;
pub mod feed;
pub mod lifecycle;
pub mod metrics;
pub mod phase;
pub mod processor;
pub mod producer;
pub mod report;
pub mod shutdown;

pub use batch::{Batch, Batcher};
pub use config::{ConsumerConfig, FullDocumentMode, ProcessorMode, ProducerConfig};
pub use consumer::{Consumer, ConsumerBuilder};
pub use error::{
    ClientError, Result, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_SEEDING_TIMEOUT, EXIT_SUCCESS,
};
pub use feed::{apply_full_document_mode, ChannelFeed, EventFeed, NdjsonFeed};
pub use lifecycle::{Expiry, LifecycleController};
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use phase::{Classification, Phase, PhaseClassifier};
pub use processor::{BatchOutcome, Processor};
pub use producer::{ChannelSink, EventSink, NdjsonSink, ProduceSummary, WorkloadProducer};
pub use report::Report;
pub use shutdown::{shutdown_signal, spawn_signal_listener, ShutdownHandle, ShutdownSignal};
