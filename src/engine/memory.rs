//! In-memory collaborator implementations
//!
//! Used by the test suite and by the demo server. Readings can be seeded
//! from a JSON file holding an array of
//! `{"timestamp", "sensor", "metric", "value"}` objects; sensors come from
//! `[[registry.sensors]]` config entries.
//!
//! # Limitations
//!
//! - Everything lives in memory and is lost on restart
//! - `query` is a linear scan over every stored reading

use crate::engine::traits::{ReadingStore, Registry};
use crate::error::StorageError;
use crate::types::{Reading, SensorAssignment, TimeWindow};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// MemoryReadingStore
// =============================================================================

/// Reading store backed by a vector behind a read-write lock
#[derive(Debug, Default)]
pub struct MemoryReadingStore {
    readings: RwLock<Vec<Reading>>,
    queries_served: AtomicU64,
}

impl MemoryReadingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given readings
    pub fn with_readings(readings: Vec<Reading>) -> Self {
        Self {
            readings: RwLock::new(readings),
            queries_served: AtomicU64::new(0),
        }
    }

    /// Load readings from a JSON array file
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` when the file cannot be read and
    /// `StorageError::CorruptedData` when it is not a valid readings array.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let readings: Vec<Reading> = serde_json::from_str(&contents).map_err(|e| {
            StorageError::CorruptedData(format!("{}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            readings = readings.len(),
            "Loaded seed readings"
        );
        Ok(Self::with_readings(readings))
    }

    /// Append one reading
    pub fn insert(&self, reading: Reading) {
        self.readings.write().push(reading);
    }

    /// Append many readings
    pub fn extend(&self, readings: impl IntoIterator<Item = Reading>) {
        self.readings.write().extend(readings);
    }

    /// Number of stored readings
    pub fn len(&self) -> usize {
        self.readings.read().len()
    }

    /// Whether the store holds no readings
    pub fn is_empty(&self) -> bool {
        self.readings.read().is_empty()
    }

    /// Number of `query` calls served
    pub fn queries_served(&self) -> u64 {
        self.queries_served.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    fn store_id(&self) -> &str {
        "memory"
    }

    async fn query(
        &self,
        window: &TimeWindow,
        sensor: Option<&str>,
    ) -> Result<Vec<Reading>, StorageError> {
        self.queries_served.fetch_add(1, Ordering::Relaxed);

        let readings = self.readings.read();
        Ok(readings
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .filter(|r| sensor.map_or(true, |s| r.sensor == s))
            .cloned()
            .collect())
    }
}

// =============================================================================
// MemoryRegistry
// =============================================================================

/// Sensor registry backed by an ordered map
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    sensors: RwLock<BTreeMap<String, String>>,
}

impl MemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from assignments; later entries override earlier ones
    pub fn with_assignments(assignments: impl IntoIterator<Item = SensorAssignment>) -> Self {
        let registry = Self::new();
        for a in assignments {
            registry.assign(a.name, a.room);
        }
        registry
    }

    /// Place a sensor in a room, replacing any previous placement
    pub fn assign(&self, sensor: impl Into<String>, room: impl Into<String>) {
        self.sensors.write().insert(sensor.into(), room.into());
    }

    /// Remove a sensor; returns whether it was registered
    pub fn remove(&self, sensor: &str) -> bool {
        self.sensors.write().remove(sensor).is_some()
    }

    /// Number of registered sensors
    pub fn len(&self) -> usize {
        self.sensors.read().len()
    }

    /// Whether no sensor is registered
    pub fn is_empty(&self) -> bool {
        self.sensors.read().is_empty()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    fn registry_id(&self) -> &str {
        "memory"
    }

    async fn all_sensors(&self) -> Result<Vec<SensorAssignment>, StorageError> {
        Ok(self
            .sensors
            .read()
            .iter()
            .map(|(name, room)| SensorAssignment::new(name.clone(), room.clone()))
            .collect())
    }
}
