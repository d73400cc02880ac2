//! Bounded operation executor.
//!
//! # Responsibilities
//! - Run a unit of work under a hard wall-clock deadline
//! - Derive that deadline from the caller's own context
//! - Turn panics inside the work into ordinary errors
//!
//! # Design Decisions
//! - The work runs on its own task; a hang there never blocks the caller
//! - On timeout only the caller's wait is cancelled. The task is detached
//!   and may run to completion; its result lands in a oneshot channel
//!   whose send never blocks, and is dropped
//! - Timeout errors are distinct from the operation's own errors
//! - Work that blocks a thread must go through `spawn_blocking` inside the
//!   operation; a blocked worker thread cannot be preempted

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::observability::metrics;

/// Stand-in for "no deadline" when `now + timeout` would overflow.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + timeout`, saturating at a far-future instant.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Deadline carried from a caller into the work it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationContext {
    deadline: Option<Instant>,
}

impl OperationContext {
    /// A context with no deadline of its own.
    pub fn background() -> Self {
        Self { deadline: None }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(deadline_after(timeout))
    }

    /// Child context expiring at the earlier of this deadline and `timeout`
    /// from now.
    pub fn child(&self, timeout: Duration) -> Self {
        let candidate = deadline_after(timeout);
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };
        Self::with_deadline(deadline)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left, or `None` without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::background()
    }
}

/// Failure of a bounded operation.
#[derive(Debug)]
pub enum OperationError<E> {
    /// The deadline passed before a result arrived.
    Timeout(Duration),
    /// The operation panicked; carries the panic message.
    Panicked(String),
    /// The operation returned its own error.
    Failed(E),
}

impl<E> OperationError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, OperationError::Timeout(_))
    }
}

impl<E: fmt::Display> fmt::Display for OperationError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationError::Timeout(budget) => {
                write!(f, "operation exceeded its {:?} budget", budget)
            }
            OperationError::Panicked(msg) => write!(f, "operation panicked: {}", msg),
            OperationError::Failed(e) => write!(f, "{}", e),
        }
    }
}

impl<E> std::error::Error for OperationError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OperationError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Run `operation` on its own task with a deadline of
/// `min(parent deadline, now + timeout)`.
///
/// Returns [`OperationError::Timeout`] as soon as the deadline passes,
/// without waiting for the task. A result that arrives at or after the
/// deadline is discarded and reported as a timeout.
pub async fn run_with_timeout<T, E, F, Fut>(
    parent: &OperationContext,
    timeout: Duration,
    operation: F,
) -> Result<T, OperationError<E>>
where
    F: FnOnce(OperationContext) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let ctx = parent.child(timeout);
    // `child` always sets a deadline.
    let deadline = ctx.deadline().unwrap_or_else(|| deadline_after(timeout));
    let budget = deadline.saturating_duration_since(Instant::now());

    // Building the future runs caller code too.
    let work = match std::panic::catch_unwind(AssertUnwindSafe(|| operation(ctx))) {
        Ok(work) => work,
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            tracing::error!(panic = %msg, "Bounded operation panicked");
            return Err(OperationError::Panicked(msg));
        }
    };

    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let outcome = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(OperationError::Failed(e)),
            Err(panic) => Err(OperationError::Panicked(panic_message(panic.as_ref()))),
        };
        // The receiver is gone once the caller timed out.
        let _ = tx.send(outcome);
    });

    let outcome = tokio::select! {
        biased;
        _ = tokio::time::sleep_until(deadline) => None,
        received = rx => Some(received),
    };

    match outcome {
        Some(Ok(result)) if Instant::now() < deadline => {
            if let Err(OperationError::Panicked(msg)) = &result {
                tracing::error!(panic = %msg, "Bounded operation panicked");
            }
            result
        }
        // The task vanished without sending; only possible if the runtime
        // is shutting down.
        Some(Err(_)) if Instant::now() < deadline => Err(OperationError::Panicked(
            "operation task dropped before completing".to_string(),
        )),
        _ => {
            metrics::record_operation_timeout();
            tracing::warn!(budget_ms = budget.as_millis() as u64, "Bounded operation timed out");
            Err(OperationError::Timeout(timeout))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
