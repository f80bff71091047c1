//! Mock upstream services
//!
//! A `MockUpstream` is a plain axum app standing in for the geodata backend,
//! the knowledge base, the encyclopedia, attraction websites and image hosts.
//! Every request it receives is recorded so tests can assert on what the
//! server under test actually sent out.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use super::constants::*;

/// One request received by a mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query string.
    pub uri: String,
    pub body: String,
}

type Recorded = Arc<Mutex<Vec<RecordedRequest>>>;

async fn record_request(
    State(recorded): State<Recorded>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, 1024 * 1024)
        .await
        .unwrap_or_default();
    recorded.lock().unwrap().push(RecordedRequest {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        body: String::from_utf8_lossy(&bytes).to_string(),
    });
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

pub struct MockUpstream {
    /// Base URL, e.g. "http://127.0.0.1:12345"
    pub base_url: String,
    recorded: Recorded,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockUpstream {
    /// Serves `router` on a random local port, recording every request.
    pub async fn spawn(router: Router) -> Self {
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let app = router.layer(middleware::from_fn_with_state(
            recorded.clone(),
            record_request,
        ));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock upstream");
        let base_url = format!(
            "http://{}",
            listener.local_addr().expect("Failed to get local address")
        );

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Mock upstream failed");
        });

        Self {
            base_url,
            recorded,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// A geodata backend answering every query with `elements`.
    pub async fn geodata(elements: Value) -> Self {
        let payload = json!({ "elements": elements });
        Self::spawn(Router::new().route(
            GEO_PATH,
            post(move || {
                let payload = payload.clone();
                async move { Json(payload) }
            }),
        ))
        .await
    }

    /// A geodata backend that always fails with `status`.
    pub async fn failing(status: StatusCode) -> Self {
        Self::spawn(Router::new().route(GEO_PATH, post(move || async move { status })))
            .await
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().unwrap().clone()
    }

    /// Number of requests whose path and query start with `prefix`.
    pub fn hits(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.uri.starts_with(prefix))
            .count()
    }

    pub fn total_hits(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

// ============================================================================
// Response helpers
// ============================================================================

/// A node element as the geodata backend sends it.
pub fn node(id: i64, lat: f64, lon: f64, tags: Value) -> Value {
    json!({ "type": "node", "id": id, "lat": lat, "lon": lon, "tags": tags })
}

/// A way element carrying a backend-computed center.
pub fn way(id: i64, lat: f64, lon: f64, tags: Value) -> Value {
    json!({ "type": "way", "id": id, "center": { "lat": lat, "lon": lon }, "tags": tags })
}

/// Knowledge-base entity document, with `filename` as its image property.
pub fn entity_document(id: &str, filename: Option<&str>) -> Value {
    let claims = match filename {
        Some(filename) => json!({
            "P18": [{ "mainsnak": { "datavalue": { "value": filename, "type": "string" } } }]
        }),
        None => json!({ "P31": [{ "mainsnak": { "datavalue": { "value": { "id": "Q5" } } } }] }),
    };
    json!({ "entities": { id: { "id": id, "claims": claims } } })
}

/// An HTML page whose head carries `meta`.
pub fn html_page(meta: &str) -> Response {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        format!("<html><head><title>Site</title>{}</head><body></body></html>", meta),
    )
        .into_response()
}

/// A router serving `body` as an image of `content_type` at `path`.
pub fn image_route(path: &str, content_type: &'static str, body: Vec<u8>) -> Router {
    Router::new().route(
        path,
        get(move || {
            let body = body.clone();
            async move { ([(header::CONTENT_TYPE, content_type)], body) }
        }),
    )
}

/// A router redirecting `path` to `location`.
pub fn redirect_route(path: &str, location: &str) -> Router {
    let location = location.to_string();
    Router::new().route(
        path,
        get(move || {
            let location = location.clone();
            async move { (StatusCode::FOUND, [(header::LOCATION, location)]).into_response() }
        }),
    )
}

/// PNG bytes of a solid `width`x`height` image.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 90, 160]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("Failed to encode png");
    out.into_inner()
}
