use anyhow::{Context, Result};
use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::enrichment::{ImageCache, ImageResolver, TtlImageCache};
use crate::geo::GeoFetcher;
use crate::image_proxy::ImageProxy;

use super::ServerConfig;

pub type GuardedGeoFetcher = Arc<GeoFetcher>;
pub type GuardedImageResolver = Arc<ImageResolver>;
pub type GuardedImageProxy = Arc<ImageProxy>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
    pub hash: String,
    pub geo_fetcher: GuardedGeoFetcher,
    pub image_resolver: GuardedImageResolver,
    pub image_proxy: GuardedImageProxy,
}

impl ServerState {
    /// Builds every collaborator once. The enrichment cache created here is
    /// shared by all requests for the lifetime of the process.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let geo_fetcher = GeoFetcher::new(
            config.geo.endpoints.clone(),
            config.geo.request_timeout(),
            &config.user_agent,
        )
        .context("Failed to build geodata client")?;

        let cache: Arc<dyn ImageCache> =
            Arc::new(TtlImageCache::new(config.enrichment.cache_ttl()));
        let image_resolver = ImageResolver::new(&config.enrichment, &config.user_agent, cache)
            .context("Failed to build enrichment client")?;

        let image_proxy = ImageProxy::new(&config.image_proxy, &config.user_agent);

        Ok(ServerState {
            config: ServerConfig::from(config),
            start_time: Instant::now(),
            started_at: Utc::now(),
            hash: env!("GIT_HASH").to_string(),
            geo_fetcher: Arc::new(geo_fetcher),
            image_resolver: Arc::new(image_resolver),
            image_proxy: Arc::new(image_proxy),
        })
    }

    pub fn with_image_resolver(mut self, image_resolver: ImageResolver) -> Self {
        self.image_resolver = Arc::new(image_resolver);
        self
    }

    /// Replaces the image proxy, e.g. with one using other collaborators.
    pub fn with_image_proxy(mut self, image_proxy: ImageProxy) -> Self {
        self.image_proxy = Arc::new(image_proxy);
        self
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedGeoFetcher {
    fn from_ref(input: &ServerState) -> Self {
        input.geo_fetcher.clone()
    }
}

impl FromRef<ServerState> for GuardedImageResolver {
    fn from_ref(input: &ServerState) -> Self {
        input.image_resolver.clone()
    }
}

impl FromRef<ServerState> for GuardedImageProxy {
    fn from_ref(input: &ServerState) -> Self {
        input.image_proxy.clone()
    }
}
