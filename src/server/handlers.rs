//! HTTP handlers
//!
//! Each query handler parses the raw query string into a [`QueryRequest`],
//! runs one engine pipeline and returns its JSON shape unchanged.

use super::types::{ApiError, HealthResponse};
use super::AppState;
use crate::metrics;
use crate::query::reducers::{BucketRow, ReadingRow};
use crate::query::resample::OverviewSeries;
use crate::query::response::QueryResponse;
use crate::query::{QueryRequest, RawQueryParams};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

type ApiResult<T> = Result<Json<QueryResponse<T>>, ApiError>;

// =============================================================================
// Health & Metrics Handlers
// =============================================================================

/// Liveness check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics::gather_text(),
    )
}

// =============================================================================
// Query Handlers
// =============================================================================

/// `GET /api/v1/readings`
pub async fn list_readings(
    State(state): State<Arc<AppState>>,
    Query(raw): Query<RawQueryParams>,
) -> ApiResult<ReadingRow> {
    let request = QueryRequest::from_raw(&raw)?;
    Ok(Json(state.engine.list(&request).await?))
}

/// `GET /api/v1/readings/latest`
pub async fn latest_readings(
    State(state): State<Arc<AppState>>,
    Query(raw): Query<RawQueryParams>,
) -> ApiResult<ReadingRow> {
    let request = QueryRequest::from_raw(&raw)?;
    Ok(Json(state.engine.latest(&request).await?))
}

/// `GET /api/v1/readings/timeframed`
pub async fn timeframed_readings(
    State(state): State<Arc<AppState>>,
    Query(raw): Query<RawQueryParams>,
) -> ApiResult<BucketRow> {
    let request = QueryRequest::from_raw(&raw)?;
    Ok(Json(state.engine.timeframed(&request).await?))
}

/// `GET /api/v1/overview`
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Query(raw): Query<RawQueryParams>,
) -> ApiResult<OverviewSeries> {
    let request = QueryRequest::from_raw(&raw)?;
    Ok(Json(state.engine.overview(&request).await?))
}
