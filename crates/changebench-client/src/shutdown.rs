//! Explicit stop for a running consumer.
//!
//! A [`ShutdownHandle`] is a cloneable trigger over a watch channel. The
//! consumer watches one clone next to its feed and deadline; the CLI hands
//! another to [`spawn_signal_listener`] so SIGINT or SIGTERM stops the run.
//!
//! ## Usage
//!
//! ```ignore
//! let shutdown = ShutdownHandle::new();
//! spawn_signal_listener(shutdown.clone());
//!
//! let consumer = Consumer::builder()
//!     .config(config)
//!     .store(store)
//!     .shutdown(shutdown)
//!     .build()?;
//! ```

use std::fmt;
use tokio::sync::watch;
use tracing::{info, warn};

/// Why the run was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Received SIGINT (Ctrl+C)
    SigInt,
    /// Received SIGTERM
    SigTerm,
    /// Stop requested through the handle
    Manual,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SigInt => write!(f, "SIGINT (Ctrl+C)"),
            Self::SigTerm => write!(f, "SIGTERM"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Handle for triggering and awaiting a stop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: watch::Sender<Option<ShutdownSignal>>,
    receiver: watch::Receiver<Option<ShutdownSignal>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(None);
        Self { sender, receiver }
    }

    /// Request a manual stop.
    pub fn shutdown(&self) {
        self.trigger(ShutdownSignal::Manual);
    }

    /// Request a stop for `signal`. The first request wins.
    pub fn trigger(&self, signal: ShutdownSignal) {
        self.sender.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(signal);
            true
        });
    }

    /// Wait until a stop is requested.
    ///
    /// Cancel-safe: it can be raced in `select!` repeatedly.
    pub async fn wait(&mut self) -> ShutdownSignal {
        loop {
            if let Some(signal) = *self.receiver.borrow_and_update() {
                return signal;
            }
            if self.receiver.changed().await.is_err() {
                return ShutdownSignal::Manual;
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.receiver.borrow().is_some()
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve when the process receives SIGINT or SIGTERM.
///
/// If a handler cannot be installed the corresponding branch never resolves.
pub async fn shutdown_signal() -> ShutdownSignal {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ShutdownSignal::SigInt,
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                ShutdownSignal::SigTerm
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<ShutdownSignal>();

    tokio::select! {
        signal = ctrl_c => signal,
        signal = terminate => signal,
    }
}

/// Trigger `handle` when the process receives a stop signal.
pub fn spawn_signal_listener(handle: ShutdownHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        info!(%signal, "Stop signal received");
        handle.trigger(signal);
    })
}
