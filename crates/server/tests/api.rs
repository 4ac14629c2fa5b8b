//! Router-level tests: every request goes through the full middleware stack
//! against an in-memory catalog.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use prodsearch::{InMemoryIndex, PipelineConfig, SearchOrchestrator};
use serde_json::{json, Value};
use server::routes::search::SearchResponse;
use server::{build_router, ServerConfig, ServerState};
use tower::ServiceExt;

fn catalog() -> InMemoryIndex {
    InMemoryIndex::from_documents(vec![
        json!({
            "id": "p1", "title": "Trail Running Shoes", "description": "Grippy outsole",
            "image_url": "https://img/p1.jpg",
            "metadata": { "categories": "Shoes", "brand": "Nike", "final_price": 120.0 }
        }),
        json!({
            "id": "p2", "title": "Road Running Shoes", "description": "Light",
            "metadata": { "categories": "Shoes", "brand": "Adidas", "final_price": 40.0 }
        }),
        json!({
            "id": "p3", "title": "Gaming Laptop", "description": "Fast GPU",
            "metadata": { "categories": "Computers", "brand": "Dell", "final_price": 1500.0 }
        }),
    ])
}

fn app_with(config: ServerConfig) -> Router {
    let pipeline = PipelineConfig::default();
    let orchestrator = SearchOrchestrator::with_index(&pipeline, Arc::new(catalog())).unwrap();
    let state = ServerState::with_orchestrator(config, orchestrator, pipeline.search);
    build_router(Arc::new(state))
}

fn app() -> Router {
    app_with(ServerConfig::default())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn error_code(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["error"]["code"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn post_search_returns_products() {
    let (status, headers, body) = send(
        app(),
        post_json("/api/search/semantic", json!({ "query": "running shoes from Nike" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-search-tier"], "lexical");
    assert!(headers.contains_key("x-request-id"));

    let response: SearchResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.total, 1);
    assert_eq!((response.limit, response.offset), (10, 0));
    assert_eq!(response.products.len(), 1);
    assert_eq!(response.products[0].id, "p1");
    assert_eq!(response.products[0].name, "Trail Running Shoes");
    assert_eq!(response.products[0].image_url.as_deref(), Some("https://img/p1.jpg"));
}

#[tokio::test]
async fn response_uses_transport_field_names() {
    let (_, _, body) = send(
        app(),
        post_json("/api/search/semantic", json!({ "query": "laptop" })),
    )
    .await;

    let value: Value = serde_json::from_slice(&body).unwrap();
    assert!(value.get("processingTimeMs").is_some());
    assert!(value["products"][0].get("imageUrl").is_some());
    assert_eq!(value["products"][0]["price"], 1500.0);
}

#[tokio::test]
async fn post_filters_constrain_results() {
    let (status, _, body) = send(
        app(),
        post_json(
            "/api/search/semantic",
            json!({
                "query": "running shoes",
                "limit": 5,
                "filters": { "category": "Shoes", "priceMax": 50 }
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let response: SearchResponse = serde_json::from_slice(&body).unwrap();
    let ids: Vec<_> = response.products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p2"]);
    assert_eq!(response.limit, 5);
}

#[tokio::test]
async fn get_search_accepts_query_params() {
    let (status, _, body) = send(
        app(),
        get("/api/search/semantic?query=running%20shoes&limit=1&offset=1&brand=Adidas"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let response: SearchResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.total, 1);
    assert_eq!((response.limit, response.offset), (1, 1));
    assert!(response.products.is_empty());
}

#[tokio::test]
async fn missing_query_is_bad_request() {
    let (status, _, body) = send(app(), post_json("/api/search/semantic", json!({ "limit": 5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

#[tokio::test]
async fn out_of_range_paging_is_bad_request() {
    for body in [
        json!({ "query": "shoes", "limit": 0 }),
        json!({ "query": "shoes", "limit": 101 }),
        json!({ "query": "shoes", "offset": -1 }),
    ] {
        let (status, _, _) = send(app(), post_json("/api/search/semantic", body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }

    let (status, _, body) = send(app(), get("/api/search/semantic?query=shoes&limit=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/search/semantic")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, _, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let (status, _, body) = send(app(), get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn health_and_readiness() {
    let (status, _, body) = send(app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], "healthy");

    let (status, _, body) = send(app(), get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["components"]["index"], "in_memory");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(app(), request).await;
    assert_eq!(headers["x-request-id"], "req-123");
}

#[tokio::test]
async fn metrics_endpoint_renders_text() {
    let app = app();
    send(app.clone(), post_json("/api/search/semantic", json!({ "query": "laptop" }))).await;

    let (status, headers, _) = send(app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers["content-type"].to_str().unwrap().starts_with("text/plain"));
}

#[tokio::test]
async fn metrics_can_be_disabled() {
    let app = app_with(ServerConfig {
        metrics_enabled: false,
        ..ServerConfig::default()
    });
    let (status, _, _) = send(app, get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
