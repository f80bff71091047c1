//! The proxy pipeline: validate, fetch, follow redirects, deliver.
//!
//! Every hop is validated before anything is sent to it, including hops
//! reached through a redirect.

use axum::body::Bytes;
use reqwest::Url;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::address::{validate_target, HostPolicy, HostResolver, SystemResolver};
use super::error::ProxyError;
use super::fetcher::{FetchedResource, ReqwestFetcher, UpstreamFetcher};
use super::transcode::{clamp_quality, clamp_width, transcode, OUTPUT_CONTENT_TYPE};
use crate::config::ImageProxySettings;
use crate::fallback::{first_of, Attempt};

/// A proxy request as received from the client.
#[derive(Debug, Clone, Default)]
pub struct ImageRequest {
    pub url: String,
    pub width: Option<u32>,
    pub quality: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ProxiedImage {
    pub content_type: String,
    pub body: Bytes,
}

pub struct ImageProxy {
    policy: HostPolicy,
    resolver: Arc<dyn HostResolver>,
    fetcher: Arc<dyn UpstreamFetcher>,
    max_redirects: usize,
    max_bytes: u64,
}

impl ImageProxy {
    pub fn new(settings: &ImageProxySettings, user_agent: &str) -> Self {
        Self::with_collaborators(
            settings,
            Arc::new(SystemResolver),
            Arc::new(ReqwestFetcher::new(settings.hop_timeout(), user_agent)),
        )
    }

    pub fn with_collaborators(
        settings: &ImageProxySettings,
        resolver: Arc<dyn HostResolver>,
        fetcher: Arc<dyn UpstreamFetcher>,
    ) -> Self {
        Self {
            policy: HostPolicy::from_allowlist(settings.allowed_hosts.as_deref()),
            resolver,
            fetcher,
            max_redirects: settings.max_redirects,
            max_bytes: settings.max_bytes,
        }
    }

    pub fn policy(&self) -> &HostPolicy {
        &self.policy
    }

    pub async fn serve(&self, request: &ImageRequest) -> Result<ProxiedImage, ProxyError> {
        let url = parse_target(&request.url)?;
        let original = self.fetch_following_redirects(url).await?;

        if !original.content_type.starts_with("image/") {
            return Err(ProxyError::UnsupportedContent(original.content_type));
        }

        let Some(width) = request.width else {
            return Ok(original);
        };
        let width = clamp_width(width);
        let quality = clamp_quality(request.quality);
        let body = original.body;
        let encoded = tokio::task::spawn_blocking(move || transcode(&body, width, quality))
            .await
            .map_err(|e| ProxyError::Transcode(e.to_string()))??;

        Ok(ProxiedImage {
            content_type: OUTPUT_CONTENT_TYPE.to_string(),
            body: Bytes::from(encoded),
        })
    }

    /// Fetches `url`, following at most `max_redirects` redirects.
    async fn fetch_following_redirects(&self, url: Url) -> Result<ProxiedImage, ProxyError> {
        let current = Mutex::new(url);
        let current = &current;

        // The initial request plus one attempt per permitted redirect.
        let hops = (0..=self.max_redirects).map(move |hop| {
            move || async move {
                let url = lock(current).clone();
                self.hop(hop, url, current).await
            }
        });

        first_of(hops)
            .await
            .map_err(|last| last.unwrap_or(ProxyError::TooManyRedirects(self.max_redirects)))
    }

    async fn hop(
        &self,
        hop: usize,
        url: Url,
        next: &Mutex<Url>,
    ) -> Attempt<ProxiedImage, ProxyError> {
        let target = match validate_target(&url, &self.policy, self.resolver.as_ref()).await {
            Ok(target) => target,
            Err(err) => return Attempt::Halt(err),
        };

        debug!("Proxy hop {} fetching {}", hop, url);
        match self.fetcher.fetch(&target, self.max_bytes).await {
            Err(err) => Attempt::Halt(err),
            Ok(FetchedResource::Resource { content_type, body }) => {
                Attempt::Success(ProxiedImage { content_type, body })
            }
            Ok(FetchedResource::Redirect {
                status,
                location: None,
            }) => Attempt::Halt(ProxyError::Upstream(format!(
                "redirect status {} without Location",
                status
            ))),
            Ok(FetchedResource::Redirect {
                location: Some(location),
                ..
            }) => match url.join(&location) {
                Ok(redirected) => {
                    *lock(next) = redirected;
                    Attempt::Fallthrough(ProxyError::TooManyRedirects(self.max_redirects))
                }
                Err(e) => Attempt::Halt(ProxyError::Upstream(format!(
                    "invalid redirect location {}: {}",
                    location, e
                ))),
            },
        }
    }
}

fn lock(url: &Mutex<Url>) -> std::sync::MutexGuard<'_, Url> {
    url.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn parse_target(raw: &str) -> Result<Url, ProxyError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ProxyError::InvalidInput("missing url".to_string()));
    }
    Url::parse(raw).map_err(|e| ProxyError::InvalidInput(format!("invalid url: {}", e)))
}
