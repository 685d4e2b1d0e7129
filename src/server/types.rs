//! Wire types for the HTTP API that are not query rows

use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error body: `{"error": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error mapped onto an HTTP status
///
/// Parameter problems the engine refuses to degrade (unknown timeframe,
/// bad interval, oversized grid) are client errors; collaborator failures
/// are server errors.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Status code for the wrapped error
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Query(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl From<crate::query::QueryError> for ApiError {
    fn from(e: crate::query::QueryError) -> Self {
        ApiError(Error::Query(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }

        let message = match &self.0 {
            Error::Query(e) => e.message.clone(),
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
