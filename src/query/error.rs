//! Query error types
//!
//! Most malformed inputs are recovered locally (a bad date bound is dropped,
//! a bad boolean falls back to its default). The errors here are the few
//! conditions that cannot be degraded. Collaborator failures travel as
//! [`crate::error::StorageError`] instead.

use std::fmt;

/// Query error with context
#[derive(Debug)]
pub struct QueryError {
    /// Error kind for programmatic handling
    pub kind: QueryErrorKind,
    /// Human-readable message
    pub message: String,
}

impl QueryError {
    /// Create a new query error
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::ValidationError, message)
    }

    /// Create a resource limit error
    pub fn resource_limit(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::ResourceLimit, message)
    }

    /// Whether the caller can fix this by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind,
            QueryErrorKind::ValidationError | QueryErrorKind::ResourceLimit
        )
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for QueryError {}

/// Categories of query errors for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// A parameter has no sensible fallback (unknown timeframe, bad interval)
    ValidationError,
    /// Query would exceed resource limits (oversized resample grid)
    ResourceLimit,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryErrorKind::ValidationError => write!(f, "ValidationError"),
            QueryErrorKind::ResourceLimit => write!(f, "ResourceLimit"),
        }
    }
}
