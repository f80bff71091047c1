//! Aggregation endpoint: geodata lookup, normalization and enrichment.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use super::state::ServerState;
use crate::enrichment::enrich_within;
use crate::geo::{build_query, haversine_meters, normalize_elements, Attraction, GeoError};

#[derive(Deserialize, Debug, Default)]
pub struct AttractionsParams {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub radius: Option<String>,
    pub enrich: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct AttractionsResponse {
    pub count: usize,
    pub items: Vec<Attraction>,
}

fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// `enrich=0` and `enrich=false` opt out, anything else keeps enrichment on.
fn enrichment_requested(raw: Option<&str>) -> bool {
    !matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("0") | Some("false")
    )
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Status for a failed geodata lookup: an upstream 5xx is passed through,
/// other upstream statuses become 502, failures without a status 500.
fn upstream_failure_status(err: &GeoError) -> StatusCode {
    match err.upstream_status() {
        Some(status) if (500..600).contains(&status) => {
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        Some(_) => StatusCode::BAD_GATEWAY,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn get_attractions(
    State(state): State<ServerState>,
    Query(params): Query<AttractionsParams>,
) -> Response {
    let (Some(lat), Some(lon)) = (
        parse_number(params.lat.as_deref()),
        parse_number(params.lon.as_deref()),
    ) else {
        return bad_request("Missing required query params: lat, lon");
    };
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return bad_request("Coordinates out of range");
    }

    let query = build_query(lat, lon, parse_number(params.radius.as_deref()));
    debug!(
        "Attractions around {},{} radius {}m timeout {}s",
        lat, lon, query.radius_m, query.timeout_sec
    );

    let payload = match state.geo_fetcher.fetch(&query).await {
        Ok(payload) => payload,
        Err(err) => {
            error!("Failed to fetch attractions: {}", err);
            let status = upstream_failure_status(&err);
            return (
                status,
                Json(json!({
                    "error": "Failed to fetch attractions",
                    "details": err.to_string(),
                    "upstreamStatus": err.upstream_status(),
                })),
            )
                .into_response();
        }
    };

    let mut items = normalize_elements(&payload.elements, state.config.geo_max_items);
    for item in items.iter_mut() {
        let distance = haversine_meters(lat, lon, item.latitude, item.longitude);
        item.distance_meters = Some(distance.round());
    }

    let enrichment = &state.config.enrichment;
    if enrichment.enabled && enrichment_requested(params.enrich.as_deref()) {
        enrich_within(
            &mut items,
            &state.image_resolver,
            enrichment.concurrency,
            enrichment.max_items,
            enrichment.budget(),
        )
        .await;
    }

    Json(AttractionsResponse {
        count: items.len(),
        items,
    })
    .into_response()
}
