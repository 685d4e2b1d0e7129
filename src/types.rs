//! Core data types used throughout the query engine
//!
//! # Key Types
//!
//! - **`Reading`**: one timestamped metric observation from a sensor
//! - **`Metric`**: the physical quantity a reading measures (`t`, `h`, `s`, `l`)
//! - **`SensorAssignment`**: a registry entry placing a sensor in a room
//! - **`TimeWindow`**: an inclusive, optionally open-ended query window
//!
//! # Example
//!
//! ```rust
//! use canopy::types::{Metric, Reading, TimeWindow};
//! use chrono::{TimeZone, Utc};
//!
//! let ts = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
//! let reading = Reading::new(ts, "vege-d4", Metric::Temperature, 21.5);
//!
//! let window = TimeWindow::between(ts, ts + chrono::Duration::hours(1));
//! assert!(window.contains(reading.timestamp));
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Metric
// =============================================================================

/// Physical quantity measured by a reading
///
/// The known set is closed (`t`, `h`, `s`, `l`), but codes outside it are kept
/// verbatim in [`Metric::Other`] rather than rejected, so readings from newer
/// sensor firmware still flow through the engine.
///
/// Serialized as its short code:
///
/// ```rust
/// use canopy::types::Metric;
///
/// let m: Metric = serde_json::from_str("\"h\"").unwrap();
/// assert_eq!(m, Metric::Humidity);
/// assert_eq!(serde_json::to_string(&Metric::Light).unwrap(), "\"l\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Metric {
    /// Air temperature in °C (`t`)
    Temperature,
    /// Relative humidity in % (`h`)
    Humidity,
    /// Substrate moisture in % (`s`)
    Substrate,
    /// Light level (`l`)
    Light,
    /// Any code outside the known set
    Other(String),
}

impl Metric {
    /// Short code used on the wire and in storage
    pub fn code(&self) -> &str {
        match self {
            Metric::Temperature => "t",
            Metric::Humidity => "h",
            Metric::Substrate => "s",
            Metric::Light => "l",
            Metric::Other(code) => code,
        }
    }

    /// Whether this metric belongs to the known closed set
    pub fn is_known(&self) -> bool {
        !matches!(self, Metric::Other(_))
    }
}

impl From<&str> for Metric {
    /// Known codes match case-insensitively; unknown codes are kept verbatim
    fn from(code: &str) -> Self {
        match code.to_ascii_lowercase().as_str() {
            "t" => Metric::Temperature,
            "h" => Metric::Humidity,
            "s" => Metric::Substrate,
            "l" => Metric::Light,
            _ => Metric::Other(code.to_string()),
        }
    }
}

impl From<String> for Metric {
    fn from(code: String) -> Self {
        Metric::from(code.as_str())
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Other(code) => code,
            known => known.code().to_string(),
        }
    }
}

impl FromStr for Metric {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Metric::from(s.trim()))
    }
}

/// Metrics order by their short code, so `co2 < h < l < s < t`
impl Ord for Metric {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code().cmp(other.code())
    }
}

impl PartialOrd for Metric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Reading
// =============================================================================

/// A single sensor observation
///
/// Readings are owned by the storage layer; the engine only ever observes
/// them. `sensor` is a plain name, not a registry key: readings may reference
/// sensors that have not been registered yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Instant the value was recorded (UTC)
    pub timestamp: DateTime<Utc>,

    /// Sensor identifier
    pub sensor: String,

    /// Quantity measured
    pub metric: Metric,

    /// Measured value
    pub value: f64,
}

impl Reading {
    /// Create a new reading
    pub fn new(
        timestamp: DateTime<Utc>,
        sensor: impl Into<String>,
        metric: Metric,
        value: f64,
    ) -> Self {
        Self {
            timestamp,
            sensor: sensor.into(),
            metric,
            value,
        }
    }

    /// Total order over readings by `(timestamp, sensor, metric)`
    pub fn order(&self, other: &Reading) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.sensor.cmp(&other.sensor))
            .then_with(|| self.metric.cmp(&other.metric))
    }
}

// =============================================================================
// Registry entries
// =============================================================================

/// Placement of a sensor in a room, as reported by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorAssignment {
    /// Unique sensor name
    pub name: String,

    /// Name of the room the sensor is installed in
    pub room: String,
}

impl SensorAssignment {
    /// Create a new assignment
    pub fn new(name: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            room: room.into(),
        }
    }
}

// =============================================================================
// TimeWindow
// =============================================================================

/// Inclusive query window; either side may be open
///
/// A side is open when the caller supplied a bound that could not be parsed:
/// the bound is dropped instead of failing the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive lower bound
    pub start: Option<DateTime<Utc>>,

    /// Inclusive upper bound
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Window with both bounds set
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Window with no bounds at all (full history)
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Check if a timestamp falls within this window (inclusive)
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }

    /// Length of the window, when both sides are bounded
    pub fn duration(&self) -> Option<Duration> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(e - s),
            _ => None,
        }
    }
}

// =============================================================================
// Timestamp helpers
// =============================================================================

/// Convert epoch milliseconds back into a UTC instant
///
/// Out-of-range inputs saturate to the Unix epoch; every value the engine
/// produces comes from a valid `DateTime`, so this only guards arithmetic.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
