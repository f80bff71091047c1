//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own state and enrichment cache.

use super::constants::*;
use attraviso_server::config::{AppConfig, CliConfig, FileConfig};
use attraviso_server::server::{make_app, RequestsLoggingLevel, ServerState};
use std::time::Duration;
use tokio::net::TcpListener;

/// Config pointing the geodata backend at `geo_endpoints` and every
/// enrichment source at `enrichment_base`.
pub fn test_config(geo_endpoints: Vec<String>, enrichment_base: &str) -> AppConfig {
    let cli = CliConfig {
        port: 0,
        metrics_port: 0,
        logging_level: RequestsLoggingLevel::None,
        geo_endpoints,
        ..Default::default()
    };
    let file = FileConfig {
        enrichment: Some(attraviso_server::config::EnrichmentConfig {
            knowledge_base_url: Some(enrichment_base.to_string()),
            media_repository_url: Some(enrichment_base.to_string()),
            // The mock serves every language on one origin.
            encyclopedia_url_template: Some(format!("{}/{{lang}}", enrichment_base)),
            request_timeout_ms: Some(2000),
            budget_ms: Some(5000),
            // Mock websites live on loopback.
            allow_private_sites: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };
    AppConfig::resolve(&cli, Some(file)).expect("Failed to resolve test config")
}

/// Test server instance
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    // Private fields - keep resources alive until drop
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server built from `config` on a random port
    ///
    /// # Panics
    ///
    /// Panics if state construction fails, the port cannot be bound or the
    /// server doesn't become ready within timeout.
    pub async fn spawn_with(config: AppConfig) -> Self {
        let state = ServerState::new(&config).expect("Failed to build server state");
        Self::spawn_with_state(state).await
    }

    /// Spawns a server over a prepared state, e.g. one with replaced collaborators
    pub async fn spawn_with_state(state: ServerState) -> Self {
        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let app = make_app(state);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the /api/health endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client
                .get(format!("{}/api/health", self.base_url))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
