//! HTTP server surface
//!
//! # Endpoints
//!
//! ## Query
//! - `GET /api/v1/readings` - Raw readings, newest first
//! - `GET /api/v1/readings/latest` - Latest reading per sensor and metric
//! - `GET /api/v1/readings/timeframed` - Bucket statistics
//! - `GET /api/v1/overview` - Gap-filled series for charts
//!
//! ## Admin
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics

pub mod handlers;
pub mod types;

use crate::config::ServerConfig;
use crate::query::QueryEngine;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    /// Query pipeline over the configured collaborators
    pub engine: QueryEngine,
    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    /// Create application state
    pub fn new(engine: QueryEngine, config: ServerConfig) -> Self {
        Self { engine, config }
    }
}

/// Build CORS layer from configuration
///
/// An empty origin list allows any origin.
pub fn build_cors_layer(cors_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    if cors_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                },
            })
            .collect();
        layer.allow_origin(origins)
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        // Health and metrics
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        // Query API
        .route("/api/v1/readings", get(handlers::list_readings))
        .route("/api/v1/readings/latest", get(handlers::latest_readings))
        .route(
            "/api/v1/readings/timeframed",
            get(handlers::timeframed_readings),
        )
        .route("/api/v1/overview", get(handlers::overview))
        // State and CORS
        .with_state(state)
        .layer(cors)
}
