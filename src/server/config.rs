use super::RequestsLoggingLevel;
use crate::config::{AppConfig, EnrichmentSettings};

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// 0 disables the metrics listener.
    pub metrics_port: u16,
    /// `max-age` of successful image proxy responses.
    pub image_cache_max_age_sec: usize,
    /// Records kept from one geodata response.
    pub geo_max_items: usize,
    pub enrichment: EnrichmentSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 5000,
            metrics_port: 9091,
            image_cache_max_age_sec: 7 * 24 * 60 * 60,
            geo_max_items: 300,
            enrichment: EnrichmentSettings::default(),
        }
    }
}

impl From<&AppConfig> for ServerConfig {
    fn from(config: &AppConfig) -> Self {
        ServerConfig {
            requests_logging_level: config.logging_level.clone(),
            port: config.port,
            metrics_port: config.metrics_port,
            image_cache_max_age_sec: config.image_proxy.cache_max_age_sec,
            geo_max_items: config.geo.max_items,
            enrichment: config.enrichment.clone(),
        }
    }
}
