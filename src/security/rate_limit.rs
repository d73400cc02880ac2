//! Per-client rate limiting with bounded memory.
//!
//! Each client identity gets its own [`TokenBucket`], created lazily on first
//! sight. A background task sweeps buckets that have been idle longer than
//! the configured threshold so memory tracks recently active clients only.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::token_bucket::TokenBucket;

/// Rate state for one client.
#[derive(Debug)]
struct ClientBucket {
    bucket: TokenBucket,
    last_access: Instant,
}

/// Snapshot of limiter state for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterStats {
    pub tracked_clients: usize,
    pub requests_per_second: f64,
    pub burst: u32,
}

/// Token-bucket limiter keyed by client identity.
///
/// The bucket map is a sharded concurrent map: admissions for different
/// clients never contend on the same lock, and the entry API makes bucket
/// creation for a new key happen exactly once.
#[derive(Debug)]
pub struct ClientRateLimiter {
    buckets: Arc<DashMap<String, ClientBucket>>,
    rate: f64,
    burst: u32,
    stop_tx: watch::Sender<bool>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl ClientRateLimiter {
    /// Create a limiter and start its eviction task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &RateLimitConfig) -> Self {
        Self::with_eviction(
            f64::from(config.requests_per_second),
            config.burst_size,
            config.cleanup_interval(),
            config.max_idle(),
        )
    }

    /// Create a limiter with explicit eviction timing.
    pub fn with_eviction(
        rate_per_sec: f64,
        burst: u32,
        cleanup_interval: Duration,
        max_idle: Duration,
    ) -> Self {
        let buckets: Arc<DashMap<String, ClientBucket>> = Arc::new(DashMap::new());
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(run_cleanup(
            Arc::clone(&buckets),
            cleanup_interval,
            max_idle,
            stop_rx,
        ));

        tracing::info!(
            requests_per_second = rate_per_sec,
            burst,
            cleanup_interval_secs = cleanup_interval.as_secs(),
            max_idle_secs = max_idle.as_secs(),
            "Client rate limiter started"
        );

        Self {
            buckets,
            rate: rate_per_sec,
            burst,
            stop_tx,
            cleanup_task: Mutex::new(Some(task)),
        }
    }

    /// Check whether `client` may make another request right now.
    ///
    /// Creates the client's bucket on first sight and always refreshes its
    /// access time, so an active client is never evicted.
    pub fn allow(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .buckets
            .entry(client.to_string())
            .or_insert_with(|| ClientBucket {
                bucket: TokenBucket::new(self.rate, self.burst),
                last_access: now,
            });

        entry.last_access = now;
        entry.bucket.try_acquire()
    }

    /// Remove buckets idle for longer than `max_idle`. Returns how many went.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        evict_idle(&self.buckets, max_idle)
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            tracked_clients: self.buckets.len(),
            requests_per_second: self.rate,
            burst: self.burst,
        }
    }

    /// Signal the eviction task to exit and wait until it has.
    ///
    /// Safe to call more than once and from several tasks at once: every
    /// caller returns only after the task has exited.
    pub async fn stop(&self) {
        self.stop_tx.send_replace(true);

        // Held across the join so overlapping callers queue behind it.
        let mut slot = self.cleanup_task.lock().await;
        if let Some(task) = slot.as_mut() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Rate limiter cleanup task failed");
            }
            *slot = None;
        }
    }

    /// True once the eviction task has exited.
    pub fn is_stopped(&self) -> bool {
        match self.cleanup_task.try_lock() {
            Ok(slot) => slot.as_ref().map_or(true, |task| task.is_finished()),
            // A stop() is joining the task right now.
            Err(_) => false,
        }
    }
}

impl Drop for ClientRateLimiter {
    fn drop(&mut self) {
        // Unjoined, but the task still observes the signal and exits.
        self.stop_tx.send_replace(true);
    }
}

fn evict_idle(buckets: &DashMap<String, ClientBucket>, max_idle: Duration) -> usize {
    let now = Instant::now();
    let before = buckets.len();

    buckets.retain(|_, entry| now.saturating_duration_since(entry.last_access) <= max_idle);

    let remaining = buckets.len();
    before.saturating_sub(remaining)
}

async fn run_cleanup(
    buckets: Arc<DashMap<String, ClientBucket>>,
    cleanup_interval: Duration,
    max_idle: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = time::interval_at(Instant::now() + cleanup_interval, cleanup_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = evict_idle(&buckets, max_idle);
                let remaining = buckets.len();
                metrics::record_tracked_clients(remaining);
                if removed > 0 {
                    tracing::debug!(removed, remaining, "Rate limiter cleanup completed");
                }
            }
            changed = stop_rx.changed() => {
                // A dropped sender also means stop.
                if changed.is_err() || *stop_rx.borrow() {
                    tracing::debug!("Rate limiter cleanup routine stopped");
                    break;
                }
            }
        }
    }
}
