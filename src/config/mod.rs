mod file_config;

pub use file_config::{EnrichmentConfig, FileConfig, GeoConfig, ImageProxyConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::time::Duration;

pub const DEFAULT_GEO_ENDPOINTS: &[&str] = &[
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://overpass.openstreetmap.ru/api/interpreter",
];

/// Upper bound accepted for `image_proxy.max_redirects`.
pub const MAX_REDIRECTS_LIMIT: usize = 10;

pub fn default_user_agent() -> String {
    format!("attraviso/{}", env!("CARGO_PKG_VERSION"))
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// Empty means the built-in endpoint list.
    pub geo_endpoints: Vec<String>,
    pub allowed_image_hosts: Option<Vec<String>>,
    pub disable_enrichment: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub user_agent: String,

    // Feature configs (with defaults)
    pub geo: GeoSettings,
    pub enrichment: EnrichmentSettings,
    pub image_proxy: ImageProxySettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let user_agent = file.user_agent.unwrap_or_else(default_user_agent);

        let geo_file = file.geo.unwrap_or_default();
        let cli_endpoints = if cli.geo_endpoints.is_empty() {
            None
        } else {
            Some(cli.geo_endpoints.clone())
        };
        let endpoints = geo_file
            .endpoints
            .or(cli_endpoints)
            .unwrap_or_else(|| {
                DEFAULT_GEO_ENDPOINTS
                    .iter()
                    .map(|e| e.to_string())
                    .collect()
            });
        let geo_defaults = GeoSettings::default();
        let geo = GeoSettings {
            endpoints,
            request_timeout_sec: geo_file
                .request_timeout_sec
                .unwrap_or(geo_defaults.request_timeout_sec),
            max_items: geo_file.max_items.unwrap_or(geo_defaults.max_items),
        };
        if geo.endpoints.iter().all(|e| e.trim().is_empty()) {
            bail!("At least one geodata endpoint must be configured");
        }

        let en_file = file.enrichment.unwrap_or_default();
        let en_defaults = EnrichmentSettings::default();
        let enrichment = EnrichmentSettings {
            enabled: en_file.enabled.unwrap_or(!cli.disable_enrichment),
            concurrency: en_file.concurrency.unwrap_or(en_defaults.concurrency),
            max_items: en_file.max_items.unwrap_or(en_defaults.max_items),
            request_timeout_ms: en_file
                .request_timeout_ms
                .unwrap_or(en_defaults.request_timeout_ms),
            budget_ms: en_file.budget_ms.unwrap_or(en_defaults.budget_ms),
            cache_ttl_sec: en_file.cache_ttl_sec.unwrap_or(en_defaults.cache_ttl_sec),
            knowledge_base_url: en_file
                .knowledge_base_url
                .unwrap_or(en_defaults.knowledge_base_url),
            media_repository_url: en_file
                .media_repository_url
                .unwrap_or(en_defaults.media_repository_url),
            encyclopedia_url_template: en_file
                .encyclopedia_url_template
                .unwrap_or(en_defaults.encyclopedia_url_template),
            thumbnail_width: en_file
                .thumbnail_width
                .unwrap_or(en_defaults.thumbnail_width),
            allow_private_sites: en_file
                .allow_private_sites
                .unwrap_or(en_defaults.allow_private_sites),
        };
        if enrichment.concurrency == 0 {
            bail!("enrichment.concurrency must be at least 1");
        }
        if !enrichment.encyclopedia_url_template.contains("{lang}") {
            bail!("enrichment.encyclopedia_url_template must contain a {{lang}} placeholder");
        }

        let proxy_file = file.image_proxy.unwrap_or_default();
        let proxy_defaults = ImageProxySettings::default();
        let image_proxy = ImageProxySettings {
            allowed_hosts: proxy_file
                .allowed_hosts
                .or_else(|| cli.allowed_image_hosts.clone()),
            max_redirects: proxy_file
                .max_redirects
                .unwrap_or(proxy_defaults.max_redirects),
            max_bytes: proxy_file.max_bytes.unwrap_or(proxy_defaults.max_bytes),
            hop_timeout_sec: proxy_file
                .hop_timeout_sec
                .unwrap_or(proxy_defaults.hop_timeout_sec),
            cache_max_age_sec: proxy_file
                .cache_max_age_sec
                .unwrap_or(proxy_defaults.cache_max_age_sec),
        };
        if image_proxy.max_redirects > MAX_REDIRECTS_LIMIT {
            bail!(
                "image_proxy.max_redirects must be at most {}, got {}",
                MAX_REDIRECTS_LIMIT,
                image_proxy.max_redirects
            );
        }
        if image_proxy.max_bytes == 0 {
            bail!("image_proxy.max_bytes must be greater than 0");
        }

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            user_agent,
            geo,
            enrichment,
            image_proxy,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GeoSettings {
    pub endpoints: Vec<String>,
    pub request_timeout_sec: u64,
    pub max_items: usize,
}

impl GeoSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }
}

impl Default for GeoSettings {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_GEO_ENDPOINTS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            request_timeout_sec: 25,
            max_items: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub enabled: bool,
    pub concurrency: usize,
    pub max_items: usize,
    /// Bounds every single outbound call.
    pub request_timeout_ms: u64,
    /// Bounds the whole fan-out of one request.
    pub budget_ms: u64,
    pub cache_ttl_sec: u64,
    pub knowledge_base_url: String,
    pub media_repository_url: String,
    pub encyclopedia_url_template: String,
    pub thumbnail_width: u32,
    /// Lets website scraping reach private and loopback addresses.
    pub allow_private_sites: bool,
}

impl EnrichmentSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_sec)
    }
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: 6,
            max_items: 60,
            request_timeout_ms: 4000,
            budget_ms: 12000,
            cache_ttl_sec: 6 * 60 * 60,
            knowledge_base_url: "https://www.wikidata.org".to_string(),
            media_repository_url: "https://commons.wikimedia.org".to_string(),
            encyclopedia_url_template: "https://{lang}.wikipedia.org".to_string(),
            thumbnail_width: 640,
            allow_private_sites: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageProxySettings {
    pub allowed_hosts: Option<Vec<String>>,
    pub max_redirects: usize,
    pub max_bytes: u64,
    pub hop_timeout_sec: u64,
    pub cache_max_age_sec: usize,
}

impl ImageProxySettings {
    pub fn hop_timeout(&self) -> Duration {
        Duration::from_secs(self.hop_timeout_sec)
    }
}

impl Default for ImageProxySettings {
    fn default() -> Self {
        Self {
            allowed_hosts: None,
            max_redirects: 3,
            max_bytes: 8 * 1024 * 1024,
            hop_timeout_sec: 10,
            cache_max_age_sec: 7 * 24 * 60 * 60,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
