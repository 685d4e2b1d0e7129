//! Range validation for raw sensor values
//!
//! Sensor hardware occasionally emits electrically induced spikes far outside
//! anything physically plausible. Those readings are excluded before any
//! reducer sees them, otherwise they silently corrupt means and extremes.
//!
//! Ranges are closed intervals. Light has no declared range, and metrics
//! outside the known set are always accepted.

use crate::error::ValidationError;
use crate::types::Metric;
use serde::{Deserialize, Serialize};

/// Inclusive plausible range for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    /// Smallest plausible value
    pub min: f64,
    /// Largest plausible value
    pub max: f64,
}

impl MetricRange {
    /// Create a new range
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check if a value lies inside the range (NaN never does)
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Outcome of validating one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Value is plausible for its metric
    Valid,
    /// Value is noise and must not reach any reducer
    Excluded,
}

/// Per-metric plausible ranges
///
/// Immutable once loaded; the query filter borrows it for the lifetime of a
/// request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidRanges {
    /// Temperature range, °C
    #[serde(default = "default_temperature")]
    pub temperature: Option<MetricRange>,

    /// Relative humidity range, %
    #[serde(default = "default_humidity")]
    pub humidity: Option<MetricRange>,

    /// Substrate moisture range, %
    #[serde(default = "default_substrate")]
    pub substrate: Option<MetricRange>,

    /// Light range (none by default)
    #[serde(default)]
    pub light: Option<MetricRange>,
}

fn default_temperature() -> Option<MetricRange> {
    Some(MetricRange::new(2.0, 70.0))
}
fn default_humidity() -> Option<MetricRange> {
    Some(MetricRange::new(2.0, 99.0))
}
fn default_substrate() -> Option<MetricRange> {
    Some(MetricRange::new(2.0, 99.0))
}

impl Default for ValidRanges {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            humidity: default_humidity(),
            substrate: default_substrate(),
            light: None,
        }
    }
}

impl ValidRanges {
    /// Range configured for a metric, if any
    pub fn range_for(&self, metric: &Metric) -> Option<&MetricRange> {
        match metric {
            Metric::Temperature => self.temperature.as_ref(),
            Metric::Humidity => self.humidity.as_ref(),
            Metric::Substrate => self.substrate.as_ref(),
            Metric::Light => self.light.as_ref(),
            Metric::Other(_) => None,
        }
    }

    /// Classify a value for the given metric
    pub fn classify(&self, metric: &Metric, value: f64) -> Validity {
        match self.range_for(metric) {
            Some(range) if !range.contains(value) => Validity::Excluded,
            _ => Validity::Valid,
        }
    }

    /// Shorthand for `classify(..) == Validity::Valid`
    #[inline]
    pub fn is_valid(&self, metric: &Metric, value: f64) -> bool {
        self.classify(metric, value) == Validity::Valid
    }

    /// Check that every configured range is well formed
    pub fn validate(&self) -> Result<(), ValidationError> {
        let named = [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("substrate", self.substrate),
            ("light", self.light),
        ];

        for (name, range) in named {
            if let Some(range) = range {
                if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                    return Err(ValidationError::InvalidFormat {
                        field: format!("validation.{}", name),
                        message: format!("invalid range [{}, {}]", range.min, range.max),
                    });
                }
            }
        }

        Ok(())
    }
}
