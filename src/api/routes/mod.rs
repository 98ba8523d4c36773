//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`crawl`] — synchronous crawl submission
//! - [`records`] — locally stored record lookups
//! - [`system`] — worker probes, health, events, OpenAPI

mod crawl;
mod records;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use crawl::*;
pub use records::*;
pub use system::*;
