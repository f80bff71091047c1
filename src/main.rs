use anyhow::{Context, Result};
use clap::Parser;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use attraviso_server::config::{AppConfig, CliConfig, FileConfig};
use attraviso_server::server::{self, RequestsLoggingLevel};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[clap(version, about = "Points of interest aggregation and image proxy server")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping). 0 disables it.
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Geodata backend endpoint, may be repeated. Tried in the given order.
    #[clap(long = "geo-endpoint")]
    pub geo_endpoints: Vec<String>,

    /// Comma separated hosts the image proxy may fetch from. `*` allows all.
    #[clap(long, value_delimiter = ',')]
    pub allowed_image_hosts: Option<Vec<String>>,

    /// Never enrich attractions with images.
    #[clap(long)]
    pub disable_enrichment: bool,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            geo_endpoints: args.geo_endpoints.clone(),
            allowed_image_hosts: args.allowed_image_hosts.clone(),
            disable_enrichment: args.disable_enrichment,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config)?;

    info!("Geodata endpoints: {:?}", config.geo.endpoints);
    match &config.image_proxy.allowed_hosts {
        Some(hosts) => info!("Image proxy host allowlist: {:?}", hosts),
        None => info!("Image proxy host allowlist not set, all public hosts permitted"),
    }
    if !config.enrichment.enabled {
        info!("Image enrichment disabled");
    }

    // Initialize metrics system
    info!("Initializing metrics...");
    server::metrics::init_metrics();

    server::run_server(config).await
}
