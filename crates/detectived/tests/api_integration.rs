//! API integration tests.
//!
//! Drives the full router: submissions through the storage lock, merging
//! and sampling, and reads of the grouped result.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use detective_api::build_router;
use detective_core::{url_slug, DetectiveConfig};
use detective_state::*;
use tower::ServiceExt;

const URL: &str = "https://example.com/";

fn test_store() -> StateStore {
    StateStore::open_in_memory().unwrap()
}

fn config(breakpoints: Vec<u32>, sample_size: usize, ttl_secs: u64) -> DetectiveConfig {
    let mut config = DetectiveConfig::default();
    config.metrics.breakpoints = breakpoints;
    config.metrics.sample_size = sample_size;
    config.lock.ttl_secs = ttl_secs;
    config
}

fn store_request(client: &str, width: u32) -> Request<Body> {
    let body = serde_json::json!({
        "url": URL,
        "viewport": {"width": width, "height": 800},
        "elements": [{"xpath": "/*[0][self::HTML]/*[1][self::BODY]/*[0][self::IMG]", "is_lcp": true}]
    });
    Request::builder()
        .method("POST")
        .uri("/api/v1/url-metrics:store")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn read_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn stored_widths(store: &StateStore) -> Vec<u64> {
    let doc = store.get_url_metrics(&url_slug(URL)).unwrap().unwrap();
    let content: serde_json::Value = serde_json::from_str(&doc.content).unwrap();
    content
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["viewport"]["width"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn healthz_ok() {
    let router = build_router(test_store(), &DetectiveConfig::default());
    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn store_samples_per_breakpoint() {
    let store = test_store();
    let router = build_router(store.clone(), &config(vec![480], 2, 60));

    // Distinct clients so the storage lock does not interfere.
    for (i, width) in [400, 450, 500].into_iter().enumerate() {
        let resp = router
            .clone()
            .oneshot(store_request(&format!("198.51.100.{i}"), width))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    assert_eq!(stored_widths(&store), vec![450, 400, 500]);

    let doc = store.get_url_metrics(&url_slug(URL)).unwrap().unwrap();
    assert_eq!(doc.title, URL);
}

#[tokio::test]
async fn same_client_is_locked_out() {
    let store = test_store();
    let router = build_router(store.clone(), &config(vec![480], 10, 60));

    let resp = router.clone().oneshot(store_request("203.0.113.5", 400)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let before = store.get_url_metrics(&url_slug(URL)).unwrap();

    let resp = router.clone().oneshot(store_request("203.0.113.5", 400)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.get_url_metrics(&url_slug(URL)).unwrap(), before);
}

#[tokio::test]
async fn zero_ttl_never_locks() {
    let store = test_store();
    let router = build_router(store.clone(), &config(vec![480], 10, 0));

    for _ in 0..3 {
        let resp = router.clone().oneshot(store_request("203.0.113.5", 400)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert_eq!(stored_widths(&store).len(), 3);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let store = test_store();
    let router = build_router(store.clone(), &DetectiveConfig::default());

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/url-metrics:store")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"url": "https://example.com/"}"#))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(store.list_url_metrics().unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_history_is_replaced() {
    let store = test_store();
    store
        .put_url_metrics(&UrlMetricsDocument {
            slug: url_slug(URL),
            title: URL.to_string(),
            content: "<html>".to_string(),
            modified_at: 1,
        })
        .unwrap();
    let router = build_router(store.clone(), &DetectiveConfig::default());

    let resp = router.oneshot(store_request("203.0.113.5", 400)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(stored_widths(&store), vec![400]);
}

#[tokio::test]
async fn read_back_grouped_metrics() {
    let store = test_store();
    let router = build_router(store, &config(vec![480], 1, 0));

    for width in [400, 1024] {
        router.clone().oneshot(store_request("203.0.113.5", width)).await.unwrap();
    }

    let uri = "/api/v1/url-metrics?url=https%3A%2F%2Fexample.com%2F";
    let (status, body) = read_json(router, uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["url"], URL);
    assert_eq!(body["data"]["complete"], true);
    let groups = body["data"]["groups"].as_array().unwrap();
    assert_eq!(groups[0]["lcp_xpath"], "/*[0][self::HTML]/*[1][self::BODY]/*[0][self::IMG]");
    assert_eq!(groups[1]["minimum_viewport_width"], 481);
}

#[tokio::test]
async fn read_unknown_url_is_not_found() {
    let router = build_router(test_store(), &DetectiveConfig::default());
    let (status, body) = read_json(router, "/api/v1/url-metrics?url=https%3A%2F%2Fnowhere.test%2F").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn metrics_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("detective.redb");

    {
        let store = StateStore::open(&db_path).unwrap();
        let router = build_router(store, &DetectiveConfig::default());
        let resp = router.oneshot(store_request("203.0.113.5", 400)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let store = StateStore::open(&db_path).unwrap();
    assert_eq!(stored_widths(&store), vec![400]);
}
