//! Portfolio content subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     → store.rs (load JSON file, or fall back to built-in sample content)
//!
//! Handler (inside a bounded operation):
//!     → ContentStore::contact / projects / reviews / games_played
//!     → models.rs DTOs serialized into the response
//! ```
//!
//! # Design Decisions
//! - Handlers only see the `ContentStore` trait; the backing store is swappable
//! - Store reads are synchronous and cheap; the deadline around them lives
//!   in the resilience layer, not here

pub mod models;
pub mod store;

pub use models::{Contact, GamePlayed, Project, ProjectType, Repository, Review};
pub use store::{ContentData, ContentStore, StaticContentStore, StoreError};
