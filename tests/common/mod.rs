//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{test_config, MockUpstream, TestClient, TestServer};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_health() {
//!     let geo = MockUpstream::geodata(serde_json::json!([])).await;
//!     let server = TestServer::spawn_with(test_config(vec![geo.url("/api/interpreter")], &geo.base_url)).await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.get_health().await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

#![allow(dead_code)]

mod client;
mod constants;
mod server;
mod upstream;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
pub use server::{test_config, TestServer};
pub use upstream::*;
