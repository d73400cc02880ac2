//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → validation.rs (method, size, header and path checks)
//!     → concurrency.rs (bounded in-flight permits)
//!     → global_limit.rs (process-wide token bucket)
//!     → rate_limit.rs (per-client token buckets)
//!     → headers.rs (hardening headers on the way out)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - No trust in client input, including forwarding headers

pub mod concurrency;
pub mod global_limit;
pub mod headers;
pub mod patterns;
pub mod rate_limit;
pub mod token_bucket;
pub mod validation;

pub use concurrency::{AdmissionGate, AdmissionPermit};
pub use global_limit::GlobalRateLimiter;
pub use patterns::{BlocklistInspector, ContentInspector};
pub use rate_limit::ClientRateLimiter;
pub use validation::{Rejection, RequestValidator, SecurityEvent, ValidationStage};
