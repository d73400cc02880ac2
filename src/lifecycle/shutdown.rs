//! Shutdown coordination.
//!
//! One [`Shutdown`] per process. The HTTP server subscribes before it starts
//! serving; the signal task (or a test harness) triggers it once.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Notify every subscriber and return how many were reached.
    ///
    /// Only the first call broadcasts; repeats return 0. Zero receivers on
    /// the first call means the server already exited on its own.
    pub fn trigger(&self, reason: &str) -> usize {
        if self.triggered.swap(true, Ordering::SeqCst) {
            tracing::debug!(reason, "Shutdown already in progress");
            return 0;
        }

        let receivers = self.tx.send(()).unwrap_or(0);
        if receivers == 0 {
            tracing::warn!(reason, "Shutdown triggered with no listeners");
        } else {
            tracing::info!(reason, receivers, "Shutdown triggered");
        }
        receivers
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Subscribers still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
