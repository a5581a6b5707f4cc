// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET  /health
// - GET  /sources
// - POST /research (200 + 400 on blank name)
// - GET  /research/last, /research/last/summary (404 before any run)
// - POST /research/summary
// - GET  /metrics

mod common;

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use account_research::api::{self, AppState};
use account_research::metrics::Metrics;
use account_research::research::types::{NewsItem, RecordField, SourceId, SourceRecord};
use account_research::Aggregator;

use common::FakeAdapter;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_state() -> AppState {
    let mut news = SourceRecord::new(SourceId::News);
    news.news = vec![NewsItem {
        title: "Acme opens new plant".into(),
        url: "https://news.example/acme-plant".into(),
        ..NewsItem::default()
    }];
    let agg = Aggregator::builder()
        .adapter(Arc::new(FakeAdapter::found(
            SourceRecord::new(SourceId::Linkedin)
                .with(RecordField::Name, "Acme Corp")
                .with(RecordField::Description, "Makes everything.")
                .with(RecordField::Founded, 1949)
                .with(RecordField::Industry, "Manufacturing"),
        )))
        .adapter(Arc::new(FakeAdapter::found(news)))
        .adapter(Arc::new(FakeAdapter::not_found(SourceId::Hunter).disabled()))
        .build()
        .expect("build aggregator");
    AppState::new(agg)
}

fn test_router(state: AppState) -> Router {
    api::router(state)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, String::from_utf8(bytes).expect("utf8"))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let (status, body) = send(test_router(test_state()), get("/health")).await;
    assert_eq!(status, StatusCode::OK, "health should be 200");
    assert_eq!(body.trim(), "OK");
}

#[tokio::test]
async fn api_sources_lists_registered_adapters() {
    let (status, body) = send(test_router(test_state()), get("/sources")).await;
    assert_eq!(status, StatusCode::OK);

    let v: Json = serde_json::from_str(&body).expect("json");
    let list = v.as_array().expect("array");
    assert_eq!(list.len(), 3);
    assert_eq!(list[0]["source"], "linkedin");
    assert_eq!(list[0]["priority"], 11);
    assert_eq!(list[0]["keyed_on"], "company_name");
    assert_eq!(list[2]["source"], "hunter");
    assert_eq!(list[2]["enabled"], false);
}

#[tokio::test]
async fn api_research_returns_result_json() {
    let payload = json!({ "company_name": "Acme Corp", "domain": "acme.com" });
    let (status, body) = send(test_router(test_state()), post_json("/research", &payload)).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");

    let v: Json = serde_json::from_str(&body).expect("json");
    assert_eq!(v["company_name"], "Acme Corp");
    assert_eq!(v["domain_used"], "acme.com");
    assert_eq!(v["status"], "complete");
    assert_eq!(v["consolidated"]["name"], "Acme Corp");
    assert_eq!(v["news"].as_array().map(Vec::len), Some(1));
    assert!(v["data"].get("linkedin").is_some());
    assert!(v["data"].get("hunter").is_none());
}

#[tokio::test]
async fn api_research_rejects_blank_company() {
    let payload = json!({ "company_name": "  " });
    let (status, body) = send(test_router(test_state()), post_json("/research", &payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let v: Json = serde_json::from_str(&body).expect("json");
    assert!(v["error"].as_str().unwrap_or_default().contains("empty"));
}

#[tokio::test]
async fn api_last_result_and_summary() {
    let state = test_state();

    let (status, _) = send(test_router(state.clone()), get("/research/last")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(test_router(state.clone()), get("/research/last/summary")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let payload = json!({ "company_name": "Acme Corp" });
    let (status, _) = send(test_router(state.clone()), post_json("/research", &payload)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(test_router(state.clone()), get("/research/last")).await;
    assert_eq!(status, StatusCode::OK);
    let last: Json = serde_json::from_str(&body).expect("json");
    assert_eq!(last["company_name"], "Acme Corp");

    let (status, summary) = send(test_router(state), get("/research/last/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(summary.starts_with("**Acme Corp**"), "summary: {summary}");
    assert!(summary.contains("Founded: 1949"));
    assert!(summary.contains("Latest: Acme opens new plant"));
}

#[tokio::test]
async fn api_summary_of_posted_result() {
    let state = test_state();
    let payload = json!({ "company_name": "Acme Corp" });
    let (_, body) = send(test_router(state.clone()), post_json("/research", &payload)).await;
    let result: Json = serde_json::from_str(&body).expect("json");

    let (status, summary) =
        send(test_router(state), post_json("/research/summary", &result)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(summary.contains("Makes everything."));
    assert!(summary.contains("Industry: Manufacturing"));
}

#[tokio::test]
async fn metrics_route_renders_exposition() {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let app = Metrics::from_handle(handle).router();
    let (status, _) = send(app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
}
