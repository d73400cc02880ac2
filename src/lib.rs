//! Portfolio API library: a read-only content API behind a request
//! admission and protection pipeline.

pub mod config;
pub mod content;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::PortfolioConfig;
pub use content::{ContentStore, StaticContentStore};
pub use http::{HttpServer, ProtectionPipeline};
pub use lifecycle::Shutdown;
