//! HTTP client for end-to-end tests
//!
//! This module provides a thin client over reqwest with one method per
//! server endpoint.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn get_with_query(&self, path: &str, query: &[(&str, String)], what: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .unwrap_or_else(|e| panic!("{} request failed: {}", what, e))
    }

    /// GET /api/health
    pub async fn get_health(&self) -> Response {
        self.get_with_query("/api/health", &[], "Health").await
    }

    /// GET /api/attractions?lat={lat}&lon={lon}[&radius={radius}]
    pub async fn get_attractions(&self, lat: f64, lon: f64, radius: Option<u32>) -> Response {
        let mut query = vec![("lat", lat.to_string()), ("lon", lon.to_string())];
        if let Some(radius) = radius {
            query.push(("radius", radius.to_string()));
        }
        self.get_with_query("/api/attractions", &query, "Get attractions")
            .await
    }

    /// GET /api/attractions with arbitrary raw query parameters
    pub async fn get_attractions_raw(&self, query: &[(&str, &str)]) -> Response {
        let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (*k, v.to_string())).collect();
        self.get_with_query("/api/attractions", &query, "Get attractions")
            .await
    }

    /// GET /api/image?url={url}[&w={width}][&q={quality}]
    pub async fn get_image(&self, url: &str, width: Option<u32>, quality: Option<u32>) -> Response {
        let mut query = vec![("url", url.to_string())];
        if let Some(width) = width {
            query.push(("w", width.to_string()));
        }
        if let Some(quality) = quality {
            query.push(("q", quality.to_string()));
        }
        self.get_with_query("/api/image", &query, "Get image").await
    }

    /// GET /api/image with arbitrary raw query parameters
    pub async fn get_image_raw(&self, query: &[(&str, &str)]) -> Response {
        let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (*k, v.to_string())).collect();
        self.get_with_query("/api/image", &query, "Get image").await
    }
}
