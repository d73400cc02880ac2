//! Concurrency admission gate.
//!
//! A fixed pool of permits caps how many requests execute at once. A request
//! waits a short, bounded time for a permit and is shed if none frees up,
//! rather than queuing indefinitely.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ConcurrencyConfig;

#[derive(Debug, Clone)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
    wait_budget: Duration,
}

impl AdmissionGate {
    pub fn new(config: &ConcurrencyConfig) -> Self {
        Self::with_capacity(config.max_in_flight, config.acquire_timeout())
    }

    pub fn with_capacity(capacity: usize, wait_budget: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            wait_budget,
        }
    }

    /// Wait up to the configured budget for a permit.
    pub async fn admit(&self) -> Option<AdmissionPermit> {
        self.try_acquire(self.wait_budget).await
    }

    /// Wait up to `wait_budget` for a permit.
    ///
    /// The permit goes back to the pool when the returned guard drops, on
    /// every exit path including unwinding.
    pub async fn try_acquire(&self, wait_budget: Duration) -> Option<AdmissionPermit> {
        let acquire = Arc::clone(&self.permits).acquire_owned();
        match tokio::time::timeout(wait_budget, acquire).await {
            Ok(Ok(permit)) => Some(AdmissionPermit { _permit: permit }),
            // Closed semaphore: treat as saturated.
            Ok(Err(_)) | Err(_) => None,
        }
    }

    /// Requests currently past the gate.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn wait_budget(&self) -> Duration {
        self.wait_budget
    }
}

/// A slot in the admission gate, released on drop.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}
