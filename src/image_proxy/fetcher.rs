//! Single-hop upstream fetches for the image proxy.

use async_trait::async_trait;
use axum::body::Bytes;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use std::time::Duration;

use super::address::VettedTarget;
use super::error::ProxyError;

/// Outcome of one hop.
#[derive(Debug, Clone)]
pub enum FetchedResource {
    /// A 3xx answer. Never followed by the fetcher itself.
    Redirect {
        status: u16,
        location: Option<String>,
    },
    /// A 2xx answer. The body is only read for `image/*` content.
    Resource { content_type: String, body: Bytes },
}

#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    /// Fetches `target` once, reading at most `max_bytes` of body.
    async fn fetch(
        &self,
        target: &VettedTarget,
        max_bytes: u64,
    ) -> Result<FetchedResource, ProxyError>;
}

/// [`UpstreamFetcher`] over reqwest, connecting only to the vetted addresses.
pub struct ReqwestFetcher {
    hop_timeout: Duration,
    user_agent: String,
}

impl ReqwestFetcher {
    pub fn new(hop_timeout: Duration, user_agent: &str) -> Self {
        Self {
            hop_timeout,
            user_agent: user_agent.to_string(),
        }
    }

    fn client_for(&self, target: &VettedTarget) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .redirect(Policy::none())
            .no_proxy()
            .timeout(self.hop_timeout)
            .user_agent(&self.user_agent);
        if let Some((host, addresses)) = &target.pinned {
            builder = builder.resolve_to_addrs(host, addresses);
        }
        builder.build()
    }
}

fn upstream(err: reqwest::Error) -> ProxyError {
    ProxyError::Upstream(err.to_string())
}

#[async_trait]
impl UpstreamFetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        target: &VettedTarget,
        max_bytes: u64,
    ) -> Result<FetchedResource, ProxyError> {
        let client = self.client_for(target).map_err(upstream)?;
        let response = client
            .get(target.url.clone())
            .header(ACCEPT, "image/*")
            .send()
            .await
            .map_err(upstream)?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Ok(FetchedResource::Redirect {
                status: status.as_u16(),
                location,
            });
        }
        if !status.is_success() {
            return Err(ProxyError::Upstream(format!(
                "upstream answered with status {}",
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if !content_type.starts_with("image/") {
            return Ok(FetchedResource::Resource {
                content_type,
                body: Bytes::new(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > max_bytes {
                return Err(ProxyError::PayloadTooLarge(max_bytes));
            }
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(upstream)?;
            if (body.len() + chunk.len()) as u64 > max_bytes {
                return Err(ProxyError::PayloadTooLarge(max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedResource::Resource {
            content_type,
            body: Bytes::from(body),
        })
    }
}
