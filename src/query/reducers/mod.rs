//! Reducers - turn filtered readings into response rows
//!
//! - [`list`]: identity projection, newest first
//! - [`latest`]: most recent reading per `(sensor, metric)`
//! - [`TimeframedReducer`]: epoch-aligned bucket statistics
//!
//! Every reducer is a pure function over a borrowed slice, so concurrent
//! queries share nothing but the read-only room map.

pub mod latest;
pub mod list;
pub mod timeframed;

pub use latest::latest;
pub use list::list;
pub use timeframed::{
    AggregationMode, BucketRow, BucketValue, GroupKey, Grouping, Summary, TimeframedReducer,
};

use crate::query::enrichment::RoomMap;
use crate::types::{Metric, Reading};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Row emitted by the list and latest reducers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingRow {
    pub timestamp: DateTime<Utc>,
    pub sensor: String,
    pub metric: Metric,
    pub value: f64,
    /// Present only when room enrichment was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

impl ReadingRow {
    /// Project a reading, attaching its room when a map is supplied
    pub fn project(reading: &Reading, rooms: Option<&RoomMap>) -> Self {
        Self {
            timestamp: reading.timestamp,
            sensor: reading.sensor.clone(),
            metric: reading.metric.clone(),
            value: reading.value,
            room: rooms.map(|m| m.room_for(&reading.sensor).to_string()),
        }
    }
}

/// Rows that can report which sensor produced them
///
/// Used by the response assembler to fill the `sensors` metadata field.
pub trait SensorLabel {
    /// Sensor name, or `None` when the row is grouped by room
    fn sensor_label(&self) -> Option<&str>;
}

impl SensorLabel for ReadingRow {
    fn sensor_label(&self) -> Option<&str> {
        Some(&self.sensor)
    }
}
