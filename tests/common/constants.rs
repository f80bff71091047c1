//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When fixture data changes (coordinates, identifiers, paths),
//! update only this file.

// ============================================================================
// Query Fixtures
// ============================================================================

/// Latitude of the London query point
pub const LONDON_LAT: f64 = 51.5;

/// Longitude of the London query point
pub const LONDON_LON: f64 = -0.12;

/// Radius used by the London scenario, in meters
pub const LONDON_RADIUS_M: u32 = 2000;

// ============================================================================
// Mock Upstream Paths
// ============================================================================

/// Path the mock geodata backend answers on
pub const GEO_PATH: &str = "/api/interpreter";

/// Knowledge-base entity without an image property
pub const ENTITY_WITHOUT_IMAGE: &str = "Q1";

/// Knowledge-base entity with an image property
pub const ENTITY_WITH_IMAGE: &str = "Q42";

/// Filename referenced by [`ENTITY_WITH_IMAGE`]
pub const ENTITY_IMAGE_FILENAME: &str = "Tower of London.jpg";

/// Host name the fake resolver maps to a public address
pub const PUBLIC_IMAGE_HOST: &str = "images.test";

// ============================================================================
// Timeouts
// ============================================================================

/// Timeout for HTTP requests in tests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum time to wait for a server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval when waiting for a server to start (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;
