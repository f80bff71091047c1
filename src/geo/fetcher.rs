//! Client for the geodata backend, with failover across equivalent endpoints.

use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::models::GeoPayload;
use super::query::GeoQuery;
use crate::fallback::{first_of, Attempt};
use crate::server::metrics;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("could not parse response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },

    #[error("all geodata endpoints failed")]
    NoEndpoints,
}

impl GeoError {
    /// Status code returned by the backend, when the failure carried one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            GeoError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Extra time granted on top of the backend's own query timeout.
const QUERY_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

pub struct GeoFetcher {
    client: reqwest::Client,
    endpoints: Vec<String>,
    timeout: Duration,
}

impl GeoFetcher {
    /// Create a fetcher trying `endpoints` in order.
    ///
    /// `timeout` bounds each endpoint attempt, there is no retry within one endpoint.
    /// Queries declaring a longer backend timeout get that plus some slack instead.
    pub fn new(
        endpoints: Vec<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            endpoints,
            timeout,
        })
    }

    /// Time allowed for one endpoint attempt at `query`.
    pub fn attempt_timeout(&self, query: &GeoQuery) -> Duration {
        let declared = Duration::from_secs(u64::from(query.timeout_sec)) + QUERY_TIMEOUT_SLACK;
        self.timeout.max(declared)
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Send `query` to the first endpoint that answers successfully.
    ///
    /// Fails only when every endpoint failed, with the last observed error.
    pub async fn fetch(&self, query: &GeoQuery) -> Result<GeoPayload, GeoError> {
        let timeout = self.attempt_timeout(query);
        let attempts: Vec<_> = self
            .endpoints
            .iter()
            .map(|endpoint: &String| {
                move || async move {
                    match self.fetch_from(endpoint, query, timeout).await {
                        Ok(payload) => Attempt::Success(payload),
                        Err(err) => {
                            warn!("Geodata endpoint failed, trying next: {}", err);
                            metrics::record_geo_endpoint_failure(endpoint);
                            Attempt::Fallthrough(err)
                        }
                    }
                }
            })
            .collect();

        first_of(attempts)
            .await
            .map_err(|last| last.unwrap_or(GeoError::NoEndpoints))
    }

    async fn fetch_from(
        &self,
        endpoint: &str,
        query: &GeoQuery,
        timeout: Duration,
    ) -> Result<GeoPayload, GeoError> {
        debug!("Querying geodata endpoint {}", endpoint);
        let response = self
            .client
            .post(endpoint)
            .timeout(timeout)
            .header(CONTENT_TYPE, "text/plain")
            .body(query.text.clone())
            .send()
            .await
            .map_err(|e| GeoError::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<GeoPayload>().await.map_err(|e| GeoError::Parse {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}
