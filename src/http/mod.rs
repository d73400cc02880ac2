//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer order, graceful shutdown)
//!     → request.rs (request ID, deadline context, client identity)
//!     → pipeline.rs (validation, admission gate, rate limits)
//!     → handlers.rs (content reads under a bounded deadline)
//!     → response.rs (error mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use pipeline::ProtectionPipeline;
pub use request::{client_key, RequestIdExt, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
