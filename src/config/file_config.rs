use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub user_agent: Option<String>,

    // Feature configs
    pub geo: Option<GeoConfig>,
    pub enrichment: Option<EnrichmentConfig>,
    pub image_proxy: Option<ImageProxyConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct GeoConfig {
    /// Interchangeable geodata endpoints, tried in order.
    pub endpoints: Option<Vec<String>>,
    pub request_timeout_sec: Option<u64>,
    pub max_items: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: Option<bool>,
    pub concurrency: Option<usize>,
    pub max_items: Option<usize>,
    pub request_timeout_ms: Option<u64>,
    pub budget_ms: Option<u64>,
    pub cache_ttl_sec: Option<u64>,
    pub knowledge_base_url: Option<String>,
    pub media_repository_url: Option<String>,
    /// Must contain a `{lang}` placeholder.
    pub encyclopedia_url_template: Option<String>,
    pub thumbnail_width: Option<u32>,
    pub allow_private_sites: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ImageProxyConfig {
    /// Unset or `["*"]` permits every host.
    pub allowed_hosts: Option<Vec<String>>,
    pub max_redirects: Option<usize>,
    pub max_bytes: Option<u64>,
    pub hop_timeout_sec: Option<u64>,
    pub cache_max_age_sec: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
