//! End-to-end tests for the attractions endpoint
//!
//! Tests the geodata query, backend failover, normalization and the
//! knowledge-base enrichment step against mock upstreams.

mod common;

use axum::{routing::get, Json, Router};
use common::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn london_museum() -> Value {
    node(
        1001,
        51.5194,
        -0.1270,
        json!({ "tourism": "museum", "name": "British Museum" }),
    )
}

/// Geodata mock plus a separate, empty origin for enrichment sources.
async fn spawn_with_elements(elements: Value) -> (MockUpstream, MockUpstream, TestServer) {
    let geo = MockUpstream::geodata(elements).await;
    let sources = MockUpstream::spawn(Router::new()).await;
    let server =
        TestServer::spawn_with(test_config(vec![geo.url(GEO_PATH)], &sources.base_url)).await;
    (geo, sources, server)
}

#[tokio::test]
async fn test_london_museum_is_returned() {
    let (geo, _sources, server) = spawn_with_elements(json!([london_museum()])).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_attractions(LONDON_LAT, LONDON_LON, Some(LONDON_RADIUS_M))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 1);
    let item = &body["items"][0];
    assert_eq!(item["id"], "node/1001");
    assert_eq!(item["name"], "British Museum");
    assert_eq!(item["category"], "museum");
    assert!(item["distanceMeters"].as_f64().unwrap() > 0.0);

    // The query sent upstream carries the requested radius and the scaled timeout
    let requests = geo.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert!(requests[0].body.contains("[timeout:25]"));
    assert!(requests[0].body.contains("around:2000,51.5,-0.12"));
}

#[tokio::test]
async fn test_unnamed_museum_is_named_after_its_category() {
    let (geo, _sources, server) =
        spawn_with_elements(json!([node(5, 51.501, -0.121, json!({ "tourism": "museum" }))])).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_attractions(LONDON_LAT, LONDON_LON, Some(LONDON_RADIUS_M))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["items"][0]["name"], "museum");
    assert_eq!(body["items"][0]["category"], "museum");
    assert_eq!(body["items"][0]["tags"]["tourism"], "museum");
    assert_eq!(geo.hits(GEO_PATH), 1);
}

#[tokio::test]
async fn test_missing_coordinates_is_bad_request() {
    let (geo, _sources, server) = spawn_with_elements(json!([])).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_attractions_raw(&[("lat", "51.5")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing required query params: lat, lon");

    let response = client
        .get_attractions_raw(&[("lat", "abc"), ("lon", "-0.12")])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Validation happens before anything is sent upstream
    assert_eq!(geo.total_hits(), 0);
}

#[tokio::test]
async fn test_out_of_range_coordinates_is_bad_request() {
    let (_geo, _sources, server) = spawn_with_elements(json!([])).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_attractions(91.0, 0.0, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fails_over_to_next_endpoint() {
    let broken = MockUpstream::failing(StatusCode::SERVICE_UNAVAILABLE).await;
    let good = MockUpstream::geodata(json!([london_museum()])).await;
    let sources = MockUpstream::spawn(Router::new()).await;
    let server = TestServer::spawn_with(test_config(
        vec![broken.url(GEO_PATH), good.url(GEO_PATH)],
        &sources.base_url,
    ))
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_attractions(LONDON_LAT, LONDON_LON, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 1);

    assert_eq!(broken.hits(GEO_PATH), 1);
    assert_eq!(good.hits(GEO_PATH), 1);
}

#[tokio::test]
async fn test_all_endpoints_failing_passes_upstream_status_through() {
    let first = MockUpstream::failing(StatusCode::BAD_GATEWAY).await;
    let last = MockUpstream::failing(StatusCode::SERVICE_UNAVAILABLE).await;
    let sources = MockUpstream::spawn(Router::new()).await;
    let server = TestServer::spawn_with(test_config(
        vec![first.url(GEO_PATH), last.url(GEO_PATH)],
        &sources.base_url,
    ))
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_attractions(LONDON_LAT, LONDON_LON, None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to fetch attractions");
    assert_eq!(body["upstreamStatus"], 503);
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn test_client_error_upstream_becomes_bad_gateway() {
    let geo = MockUpstream::failing(StatusCode::TOO_MANY_REQUESTS).await;
    let sources = MockUpstream::spawn(Router::new()).await;
    let server =
        TestServer::spawn_with(test_config(vec![geo.url(GEO_PATH)], &sources.base_url)).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_attractions(LONDON_LAT, LONDON_LON, None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["upstreamStatus"], 429);
}

#[tokio::test]
async fn test_elements_without_coordinates_are_excluded() {
    let elements = json!([
        london_museum(),
        // Node without its own coordinates
        { "type": "node", "id": 2, "tags": { "tourism": "viewpoint" } },
        // Way without a backend-computed center
        { "type": "way", "id": 3, "tags": { "historic": "castle" } },
        way(4, 51.5081, -0.0759, json!({ "historic": "castle", "name": "Tower of London" })),
    ]);
    let (_geo, _sources, server) = spawn_with_elements(elements).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_attractions(LONDON_LAT, LONDON_LON, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 2);
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["node/1001", "way/4"]);
    assert_eq!(body["items"][1]["category"], "castle");
}

#[tokio::test]
async fn test_knowledge_base_enrichment_is_cached_across_requests() {
    let geo = MockUpstream::geodata(json!([node(
        7,
        51.5081,
        -0.0759,
        json!({ "historic": "castle", "name": "Tower of London", "wikidata": ENTITY_WITH_IMAGE }),
    )]))
    .await;
    let entity_path = format!("/wiki/Special:EntityData/{}.json", ENTITY_WITH_IMAGE);
    let document = entity_document(ENTITY_WITH_IMAGE, Some(ENTITY_IMAGE_FILENAME));
    let sources = MockUpstream::spawn(Router::new().route(
        &entity_path,
        get(move || {
            let document = document.clone();
            async move { Json(document) }
        }),
    ))
    .await;
    let server =
        TestServer::spawn_with(test_config(vec![geo.url(GEO_PATH)], &sources.base_url)).await;
    let client = TestClient::new(server.base_url.clone());

    let expected = sources.url("/wiki/Special:FilePath/Tower_of_London.jpg?width=640");
    for _ in 0..2 {
        let response = client.get_attractions(LONDON_LAT, LONDON_LON, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["items"][0]["imageUrl"], expected.as_str());
    }

    // Second request is served from the shared cache
    assert_eq!(sources.hits(&entity_path), 1);
    assert_eq!(geo.hits(GEO_PATH), 2);
}

#[tokio::test]
async fn test_enrichment_can_be_skipped_per_request() {
    let geo = MockUpstream::geodata(json!([node(
        7,
        51.5081,
        -0.0759,
        json!({ "historic": "castle", "wikidata": ENTITY_WITH_IMAGE }),
    )]))
    .await;
    let sources = MockUpstream::spawn(Router::new()).await;
    let server =
        TestServer::spawn_with(test_config(vec![geo.url(GEO_PATH)], &sources.base_url)).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_attractions_raw(&[("lat", "51.5"), ("lon", "-0.12"), ("enrich", "0")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["items"][0].get("imageUrl").is_none());
    // Unnamed records fall back to their category
    assert_eq!(body["items"][0]["name"], "castle");
    assert_eq!(sources.total_hits(), 0);
}
