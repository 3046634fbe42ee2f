//! Integration tests for the history client and refresh controller over HTTP

mod common;

use std::sync::Arc;

use pricewatch::cache::{cache_key, CacheStore, CACHE_NAME};
use pricewatch::data::history::DEFAULT_HOST;
use pricewatch::data::{FetchError, HistoryClient, PriceSource, TimeRange};
use pricewatch::refresh::{RefreshConfig, RefreshController};
use secrecy::SecretString;

use common::{StubServer, TWO_POINT_BODY};

fn client_for(server: &StubServer) -> HistoryClient {
    HistoryClient::new(&SecretString::from("test-key".to_string()), DEFAULT_HOST)
        .expect("client should build")
        .with_base_url(server.base_url.clone())
}

#[tokio::test]
async fn test_fetch_history_sends_query_and_headers() {
    let server = StubServer::start("200 OK", TWO_POINT_BODY);

    let response = client_for(&server)
        .fetch_history(TimeRange::OneYear.query_params())
        .await
        .expect("fetch should succeed");

    assert_eq!(response.meta.symbol, "NVDA");
    assert_eq!(response.body.len(), 2);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let head = requests[0].to_lowercase();
    assert!(head.starts_with("get /api/v1/markets/stock/history?"));
    assert!(head.contains("symbol=nvda"));
    assert!(head.contains("interval=1wk"));
    assert!(head.contains("period=12mo"));
    assert!(head.contains("x-rapidapi-key: test-key"));
    assert!(head.contains("x-rapidapi-host: yahoo-finance15.p.rapidapi.com"));
}

#[tokio::test]
async fn test_fetch_history_non_success_status() {
    let server = StubServer::start("429 Too Many Requests", r#"{"message":"slow down"}"#);

    let result = client_for(&server)
        .fetch_history(TimeRange::OneMonth.query_params())
        .await;

    match result {
        Err(FetchError::Status {
            status,
            status_text,
        }) => {
            assert_eq!(status, 429);
            assert_eq!(status_text, "Too Many Requests");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_history_malformed_body() {
    let server = StubServer::start("200 OK", r#"{"meta": {"symbol": "NVDA"}}"#);

    let result = client_for(&server)
        .fetch_history(TimeRange::OneDay.query_params())
        .await;

    assert!(matches!(result, Err(FetchError::Parse(_))));
}

#[tokio::test]
async fn test_refresh_over_http_then_cache_hit() {
    let server = StubServer::start("200 OK", TWO_POINT_BODY);
    let temp_dir = tempfile::TempDir::new().unwrap();
    let cache = Arc::new(CacheStore::with_dir(temp_dir.path().to_path_buf()));
    let controller = RefreshController::new(
        Arc::new(client_for(&server)),
        cache.clone(),
        RefreshConfig::default(),
    );

    let points = controller.refresh(TimeRange::OneMonth).await.unwrap();
    assert_eq!(points[0].date, "2023-11-14T22:13:20.000Z");
    assert_eq!(points[1].date, "2023-11-15T22:13:20.000Z");
    assert!((points[1].value - 455.5).abs() < 0.001);

    let again = controller.refresh(TimeRange::OneMonth).await.unwrap();
    assert_eq!(again, points);
    assert_eq!(server.requests().len(), 1, "second refresh served from cache");
    assert!(cache.get(&cache_key(CACHE_NAME, "1M")).is_some());
}

#[tokio::test]
async fn test_refresh_over_http_error_writes_nothing() {
    let server = StubServer::start("429 Too Many Requests", "{}");
    let temp_dir = tempfile::TempDir::new().unwrap();
    let cache = Arc::new(CacheStore::with_dir(temp_dir.path().to_path_buf()));
    let controller = RefreshController::new(
        Arc::new(client_for(&server)),
        cache.clone(),
        RefreshConfig::default(),
    );

    let result = controller.refresh(TimeRange::OneMonth).await;

    assert!(matches!(result, Err(FetchError::Status { status: 429, .. })));
    assert!(cache.get(&cache_key(CACHE_NAME, "1M")).is_none());
    assert!(!temp_dir.path().join("kv.json").exists());
}
