//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Handler needs the content store:
//!     → timeouts.rs (run the read on its own task, under a deadline)
//!     → result, operation error, panic, or timeout back to the handler
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every downstream call has a deadline
//! - A panicking operation never takes the serving task down with it

pub mod timeouts;

pub use timeouts::{run_with_timeout, OperationContext, OperationError};
