//! Collaborator traits for the query engine
//!
//! The engine never owns persisted data. Readings and sensor placement come
//! from these two read-only interfaces, so any backend (SQL, object store,
//! in-memory) can sit behind the HTTP layer.

use crate::error::StorageError;
use crate::types::{Reading, SensorAssignment, TimeWindow};
use async_trait::async_trait;

// =============================================================================
// ReadingStore Trait
// =============================================================================

/// Source of raw sensor readings
#[async_trait]
pub trait ReadingStore: Send + Sync + 'static {
    /// Identifier for logs
    fn store_id(&self) -> &str;

    /// Candidate readings for a window and optional sensor
    ///
    /// Implementations may over-fetch: the engine filters again, so returning
    /// readings outside the window or for other sensors is harmless. Order is
    /// unspecified.
    async fn query(
        &self,
        window: &TimeWindow,
        sensor: Option<&str>,
    ) -> Result<Vec<Reading>, StorageError>;
}

// =============================================================================
// Registry Trait
// =============================================================================

/// Source of sensor → room placement
#[async_trait]
pub trait Registry: Send + Sync + 'static {
    /// Identifier for logs
    fn registry_id(&self) -> &str;

    /// Every registered sensor with its room
    async fn all_sensors(&self) -> Result<Vec<SensorAssignment>, StorageError>;
}
