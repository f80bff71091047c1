//! Attraviso Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod enrichment;
pub mod fallback;
pub mod geo;
pub mod image_proxy;
pub mod server;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use server::{run_server, RequestsLoggingLevel};
