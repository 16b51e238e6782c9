//! Event feed sources.
//!
//! The consumer pulls one event at a time from an [`EventFeed`] and races that
//! pull against its lifecycle deadline, so `next_event` must be cancel-safe:
//! dropping the future before it completes must not lose an event.
//!
//! ## Implementations
//!
//! - [`NdjsonFeed`]: newline-delimited JSON from stdin, a file, or any async
//!   reader (the producer writes this format)
//! - [`ChannelFeed`]: events pushed through a tokio mpsc channel, used when
//!   producer and consumer share a process

use crate::config::FullDocumentMode;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use changebench_core::{wire, ChangeEvent, OperationKind};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// An ordered, unbounded source of change events.
#[async_trait]
pub trait EventFeed: Send {
    /// Wait for the next event.
    ///
    /// `Ok(None)` is end-of-feed. `Err` is a transport failure; the feed is
    /// not retried.
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>>;

    /// Release the underlying connection. Calling it again is a no-op.
    async fn close(&mut self);

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// Apply the feed's full-document setting to an incoming event.
///
/// `default` keeps embedded documents on inserts only; `updateLookup` keeps
/// them on inserts and updates. Other operations never carry one.
pub fn apply_full_document_mode(mode: FullDocumentMode, event: &mut ChangeEvent) {
    let keep = event.operation.supports_document()
        && (event.operation == OperationKind::Insert || mode == FullDocumentMode::UpdateLookup);
    if !keep {
        event.strip_document();
    }
}

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Feed reading newline-delimited JSON events.
pub struct NdjsonFeed {
    name: String,
    lines: Option<Lines<BufReader<BoxedReader>>>,
    events_read: u64,
}

impl NdjsonFeed {
    /// Open a feed at `path`; `-` reads stdin.
    pub async fn open(path: &str) -> Result<Self> {
        if path == "-" {
            return Ok(Self::from_reader("stdin", tokio::io::stdin()));
        }

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ClientError::FeedConnect(path.to_string(), e.to_string()))?;

        info!(feed = %path, "Opened event feed");
        Ok(Self::from_reader(path, file))
    }

    /// Wrap any async reader.
    pub fn from_reader<R>(name: impl Into<String>, reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let boxed: BoxedReader = Box::new(reader);
        Self {
            name: name.into(),
            lines: Some(BufReader::new(boxed).lines()),
            events_read: 0,
        }
    }

    pub fn events_read(&self) -> u64 {
        self.events_read
    }
}

#[async_trait]
impl EventFeed for NdjsonFeed {
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };

        loop {
            let line = lines
                .next_line()
                .await
                .map_err(|e| ClientError::FeedTransport(e.to_string()))?;

            let Some(line) = line else {
                return Ok(None);
            };

            if let Some(event) = wire::decode_line(&line)? {
                self.events_read += 1;
                return Ok(Some(event));
            }
        }
    }

    async fn close(&mut self) {
        if self.lines.take().is_some() {
            info!(
                feed = %self.name,
                events_read = self.events_read,
                "Event feed released"
            );
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Feed backed by a tokio mpsc channel.
///
/// Senders may push `Err` to simulate a transport failure.
pub struct ChannelFeed {
    receiver: mpsc::Receiver<Result<ChangeEvent>>,
    closed: bool,
}

impl ChannelFeed {
    pub fn new(receiver: mpsc::Receiver<Result<ChangeEvent>>) -> Self {
        Self {
            receiver,
            closed: false,
        }
    }

    /// Create a feed plus the sender that drives it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Result<ChangeEvent>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl EventFeed for ChannelFeed {
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>> {
        if self.closed {
            return Ok(None);
        }
        match self.receiver.recv().await {
            Some(item) => item.map(Some),
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.receiver.close();
            debug!("Channel feed released");
        }
    }

    fn name(&self) -> &str {
        "channel"
    }
}
