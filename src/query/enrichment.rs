//! Room enrichment
//!
//! A read-only `sensor → room` lookup built from the registry at the start
//! of every request that asks for it. Sensor placement can change between
//! requests, so the map is never cached.

use crate::engine::traits::Registry;
use crate::error::StorageError;
use crate::types::SensorAssignment;
use std::collections::HashMap;

/// Per-request sensor → room lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomMap {
    rooms: HashMap<String, String>,
}

impl RoomMap {
    /// Build from registry entries; a later entry for the same sensor wins
    pub fn from_assignments<I>(assignments: I) -> Self
    where
        I: IntoIterator<Item = SensorAssignment>,
    {
        let rooms = assignments
            .into_iter()
            .map(|a| (a.name, a.room))
            .collect();
        Self { rooms }
    }

    /// Load the current assignments from the registry
    pub async fn load(registry: &dyn Registry) -> Result<Self, StorageError> {
        let assignments = registry.all_sensors().await?;
        tracing::debug!(sensors = assignments.len(), "Loaded room assignments");
        Ok(Self::from_assignments(assignments))
    }

    /// Room a sensor is installed in, or `""` when the sensor is unregistered
    pub fn room_for(&self, sensor: &str) -> &str {
        self.rooms.get(sensor).map(String::as_str).unwrap_or("")
    }

    /// Number of registered sensors
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no sensor is registered
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
