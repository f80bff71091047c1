use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{error, info};

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::attractions::get_attractions;
use super::image::get_image;
use super::metrics::metrics_handler;
use super::{http_cache, log_requests, state::ServerState};
use crate::config::AppConfig;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthStats {
    pub ok: bool,
    pub uptime: String,
    pub started_at: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = HealthStats {
        ok: true,
        uptime: format_uptime(state.start_time.elapsed()),
        started_at: state.started_at.to_rfc3339(),
        hash: state.hash.clone(),
    };
    Json(stats)
}

pub fn make_app(state: ServerState) -> Router {
    let image_routes: Router = Router::new()
        .route("/image", get(get_image))
        .layer(middleware::from_fn_with_state(
            state.config.image_cache_max_age_sec,
            http_cache,
        ))
        .with_state(state.clone());

    let api_routes: Router = Router::new()
        .route("/health", get(health))
        .route("/attractions", get(get_attractions))
        .with_state(state.clone())
        .merge(image_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(config: AppConfig) -> Result<()> {
    let state = ServerState::new(&config)?;
    let app = make_app(state);

    if config.metrics_port > 0 {
        let metrics_listener = tokio::net::TcpListener::bind(("0.0.0.0", config.metrics_port))
            .await
            .with_context(|| format!("Failed to bind metrics port {}", config.metrics_port))?;
        info!("Metrics available at port {}", config.metrics_port);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
                error!("Metrics server stopped: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    info!("Ready to serve at port {}", config.port);

    Ok(axum::serve(listener, app).await?)
}
