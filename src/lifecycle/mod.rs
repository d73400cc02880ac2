//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → drain in-flight requests
//!             → stop rate limiter eviction → exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, stop background tasks
//! - Background tasks are joined, not abandoned

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
