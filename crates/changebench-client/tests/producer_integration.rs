//! Producer and consumer wired together against a real SQLite store.

use changebench_client::{
    ChannelFeed, ChannelSink, Consumer, ConsumerConfig, FullDocumentMode, NdjsonFeed,
    NdjsonSink, ProducerConfig, WorkloadProducer,
};
use changebench_store::{DocumentStore, SqliteDocumentStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn producer_config(documents: usize, updates: usize) -> ProducerConfig {
    ProducerConfig {
        documents,
        updates,
        drop_first: true,
        update_interval: Duration::ZERO,
        payload_bytes: 16,
    }
}

fn consumer_config(mode: FullDocumentMode, batch_size: usize) -> ConsumerConfig {
    let mut config = ConsumerConfig::new(mode, batch_size);
    config.seeding_timeout = Duration::from_secs(10);
    config.idle_timeout = Duration::from_secs(5);
    config
}

async fn sqlite_store(dir: &TempDir) -> Arc<SqliteDocumentStore> {
    let path = dir.path().join("bench.db");
    Arc::new(SqliteDocumentStore::new(&path).await.unwrap())
}

#[tokio::test]
async fn test_producer_feeds_consumer_over_channel() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;

    let (tx, feed) = ChannelFeed::channel(64);
    let producer = WorkloadProducer::new(producer_config(20, 45), store.clone()).unwrap();

    let consumer = Consumer::builder()
        .config(consumer_config(FullDocumentMode::Default, 10))
        .store(store.clone())
        .build()
        .unwrap();

    let produce = tokio::spawn(async move {
        let mut sink = ChannelSink::new(tx);
        producer.produce(&mut sink).await
    });

    let report = consumer.run(feed).await.unwrap();
    let summary = produce.await.unwrap().unwrap();

    assert_eq!(summary.seeded, 20);
    assert_eq!(summary.updated, 45);
    assert_eq!(report.metrics.processed_events, 45);
    assert_eq!(report.metrics.batch_count, 5);
    assert_eq!(report.metrics.failed_batch_count, 0);
    assert_eq!(store.count().await.unwrap(), 20);
}

#[tokio::test]
async fn test_producer_file_replayed_in_both_modes() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;
    let feed_path = dir.path().join("feed.ndjson");

    let producer = WorkloadProducer::new(producer_config(5, 12), store.clone()).unwrap();
    let file = tokio::fs::File::create(&feed_path).await.unwrap();
    let mut sink = NdjsonSink::new(file);
    producer.produce(&mut sink).await.unwrap();

    let contents = tokio::fs::read_to_string(&feed_path).await.unwrap();
    assert_eq!(contents.lines().count(), 1 + 5 + 12);

    for mode in [FullDocumentMode::Default, FullDocumentMode::UpdateLookup] {
        let feed = NdjsonFeed::open(feed_path.to_str().unwrap()).await.unwrap();
        let consumer = Consumer::builder()
            .config(consumer_config(mode, 5))
            .store(store.clone())
            .build()
            .unwrap();

        let report = consumer.run(feed).await.unwrap();
        assert_eq!(report.metrics.processed_events, 12, "mode {}", mode);
        assert_eq!(report.metrics.batch_count, 3, "mode {}", mode);
        assert_eq!(report.metrics.failed_batch_count, 0, "mode {}", mode);
    }
}

#[tokio::test]
async fn test_missing_feed_file_is_connect_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.ndjson");

    let err = NdjsonFeed::open(missing.to_str().unwrap()).await.err().unwrap();
    assert!(matches!(
        err,
        changebench_client::ClientError::FeedConnect(_, _)
    ));
}
