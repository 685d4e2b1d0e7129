//! HTTP Server Integration Tests
//!
//! Drives the axum router with `tower::ServiceExt::oneshot` against an
//! in-memory store.
//!
//! # Test Coverage
//!
//! 1. **Health / Metrics** - liveness and Prometheus exposition
//! 2. **Readings** - list and latest routes, response shapes
//! 3. **Timeframed** - bucket rows, room grouping, bad timeframe → 400
//! 4. **Overview** - resampled series, bad interval → 400
//! 5. **Failures** - storage errors → 500 with `{"error": ...}`

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use canopy::{
    config::ServerConfig,
    engine::{MemoryReadingStore, MemoryRegistry, ReadingStore},
    error::StorageError,
    query::QueryEngine,
    server::{router, AppState},
    types::{Metric, Reading, SensorAssignment, TimeWindow},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

// =============================================================================
// Helpers
// =============================================================================

fn server_config() -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        log_level: "info".to_string(),
        cors_allowed_origins: Vec::new(),
    }
}

/// Readings relative to the real clock so default windows include them
fn recent_readings(now: DateTime<Utc>) -> Vec<Reading> {
    let hour = now - Duration::minutes(90);
    vec![
        Reading::new(hour, "vege-d4", Metric::Temperature, 21.0),
        Reading::new(hour + Duration::minutes(5), "vege-d4", Metric::Temperature, 23.0),
        Reading::new(hour + Duration::minutes(5), "vege-d4", Metric::Temperature, 80.0),
        Reading::new(hour, "flora-1", Metric::Humidity, 65.0),
    ]
}

fn app_with_store(store: Arc<dyn ReadingStore>) -> Router {
    let registry = MemoryRegistry::with_assignments(vec![
        SensorAssignment::new("vege-d4", "vegetativo"),
        SensorAssignment::new("flora-1", "floracion"),
    ]);
    let engine = QueryEngine::new(store, Arc::new(registry));
    router(Arc::new(AppState::new(engine, server_config())))
}

fn app() -> Router {
    let store = MemoryReadingStore::with_readings(recent_readings(Utc::now()));
    app_with_store(Arc::new(store))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

struct BrokenStore;

#[async_trait]
impl ReadingStore for BrokenStore {
    fn store_id(&self) -> &str {
        "broken"
    }

    async fn query(
        &self,
        _window: &TimeWindow,
        _sensor: Option<&str>,
    ) -> Result<Vec<Reading>, StorageError> {
        Err(StorageError::Unavailable("database is down".into()))
    }
}

// =============================================================================
// Health / Metrics
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (status, json) = get(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_exposition() {
    let app = app();
    let (status, _) = get(app.clone(), "/api/v1/readings").await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("canopy_queries_total"));
}

// =============================================================================
// Readings
// =============================================================================

#[tokio::test]
async fn test_list_default_is_paginated_envelope() {
    let (status, json) = get(app(), "/api/v1/readings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    assert_eq!(json["page"], 1);
    assert_eq!(json["page_size"], 1000);
    assert_eq!(json["total_pages"], 1);
    assert_eq!(json["results"].as_array().unwrap().len(), 3);
    assert!(json.get("metadata").is_none());
}

#[tokio::test]
async fn test_list_bare_array_with_rooms() {
    let (status, json) = get(app(), "/api/v1/readings?paginate=false&include_room=true").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r["room"].is_string()));
    assert!(rows.iter().all(|r| r["value"] != 80.0));
}

#[tokio::test]
async fn test_latest_with_sensor_and_metadata() {
    let (status, json) = get(
        app(),
        "/api/v1/readings/latest?sensors=vege-d4&paginate=false&metadata=true",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["value"], 23.0);
    assert_eq!(json["metadata"]["sensors"][0], "vege-d4");
    assert_eq!(json["metadata"]["record_count"], 1);
    assert!(json["metadata"]["start_date"].is_string());
}

#[tokio::test]
async fn test_malformed_date_does_not_fail() {
    let (status, json) = get(
        app(),
        "/api/v1/readings?start_date=not-a-date&paginate=false",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 3);
}

// =============================================================================
// Timeframed
// =============================================================================

#[tokio::test]
async fn test_timeframed_room_summaries() {
    let (status, json) = get(
        app(),
        "/api/v1/readings/timeframed?timeframe=1D&include_room=true&aggregations=true&paginate=false",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert!(!rows.is_empty());
    for row in rows {
        assert!(row.get("room").is_some());
        assert!(row.get("sensor").is_none());
        assert!(row["value"]["mean"].is_number());
    }
}

#[tokio::test]
async fn test_unknown_timeframe_is_bad_request() {
    let (status, json) = get(app(), "/api/v1/readings/timeframed?timeframe=2H").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("2H"));
}

// =============================================================================
// Overview
// =============================================================================

#[tokio::test]
async fn test_overview_series() {
    let (status, json) = get(
        app(),
        "/api/v1/overview?timeframe=1H&interval=30m&metric=t&paginate=false",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let series = json.as_array().unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["sensor"], "vege-d4");
    assert_eq!(series[0]["metric"], "t");
    assert!(series[0].get("room").is_none());
}

#[tokio::test]
async fn test_overview_bad_interval_is_bad_request() {
    let (status, json) = get(app(), "/api/v1/overview?interval=soon").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_overview_multibyte_or_huge_interval_is_bad_request() {
    for interval in ["5%C3%A9", "9999999999999999d"] {
        let uri = format!("/api/v1/overview?interval={interval}");
        let (status, json) = get(app(), &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{interval}");
        assert!(json["error"].is_string());
    }
}

#[tokio::test]
async fn test_multibyte_dates_are_ignored() {
    for query in [
        "start_date=Txx%E2%82%AC%E2%82%AC",
        "end_date=2025-01-06T10%3A00%3A00%20%C3%BC3%3A00",
        "end_date=-262143-01-01",
    ] {
        let uri = format!("/api/v1/readings?{query}&paginate=false");
        let (status, json) = get(app(), &uri).await;
        assert_eq!(status, StatusCode::OK, "{query}");
        assert!(json.is_array());
    }
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_storage_failure_is_server_error() {
    let app = app_with_store(Arc::new(BrokenStore));
    let (status, json) = get(app, "/api/v1/readings/latest").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("database is down"));
}
