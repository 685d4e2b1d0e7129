//! Query filter - window, sensor and validity predicates
//!
//! Narrows a candidate collection down to the readings a reducer may see.
//! The range validator runs on every reading; excluded values are counted
//! per metric so noisy hardware shows up in the metrics endpoint.

use crate::metrics::READINGS_EXCLUDED;
use crate::query::validator::ValidRanges;
use crate::types::{Reading, TimeWindow};

/// Active predicates for one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterParams {
    /// Inclusive window; open sides are unbounded
    pub window: TimeWindow,
    /// Exact sensor name
    pub sensor: Option<String>,
}

impl FilterParams {
    /// Create filter parameters
    pub fn new(window: TimeWindow, sensor: Option<String>) -> Self {
        Self { window, sensor }
    }
}

/// Filter operator borrowing the validation table
#[derive(Debug, Clone, Copy)]
pub struct QueryFilter<'a> {
    ranges: &'a ValidRanges,
}

impl<'a> QueryFilter<'a> {
    /// Create a filter backed by the given ranges
    pub fn new(ranges: &'a ValidRanges) -> Self {
        Self { ranges }
    }

    /// Whether a single reading passes every active predicate
    pub fn matches(&self, reading: &Reading, params: &FilterParams) -> bool {
        if !params.window.contains(reading.timestamp) {
            return false;
        }

        if let Some(sensor) = &params.sensor {
            if reading.sensor != *sensor {
                return false;
            }
        }

        if !self.ranges.is_valid(&reading.metric, reading.value) {
            READINGS_EXCLUDED
                .with_label_values(&[reading.metric.code()])
                .inc();
            return false;
        }

        true
    }

    /// Keep the readings that pass every predicate
    ///
    /// Order of the survivors is unspecified; callers sort when it matters.
    pub fn apply(&self, readings: Vec<Reading>, params: &FilterParams) -> Vec<Reading> {
        readings
            .into_iter()
            .filter(|r| self.matches(r, params))
            .collect()
    }
}
