//! Timeframed reducer - epoch-aligned bucket statistics
//!
//! Readings are streamed once into an ordered map keyed by
//! `(group, metric, bucket_start)`. Each entry holds a small accumulator
//! (count, compensated sum, min, max, first, last) that is finalised into a
//! row after the pass, so memory grows with the number of non-empty buckets
//! rather than with the number of readings.
//!
//! # Example
//!
//! ```rust
//! use canopy::query::reducers::{BucketValue, TimeframedReducer};
//! use canopy::query::Timeframe;
//! use canopy::types::{Metric, Reading};
//! use chrono::{TimeZone, Utc};
//!
//! let at = |h, m| Utc.with_ymd_and_hms(2025, 1, 6, h, m, 0).unwrap();
//! let readings = vec![
//!     Reading::new(at(9, 10), "A", Metric::Temperature, 20.0),
//!     Reading::new(at(9, 50), "A", Metric::Temperature, 22.0),
//!     Reading::new(at(10, 5), "A", Metric::Temperature, 25.0),
//! ];
//!
//! let reducer = TimeframedReducer::new(Timeframe::OneHour);
//! let rows = reducer.reduce(&readings, None);
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0].value, BucketValue::Simple(21.0));
//! assert_eq!(rows[1].value, BucketValue::Simple(25.0));
//! ```

use crate::query::enrichment::RoomMap;
use crate::query::numeric::KahanSum;
use crate::query::timeframe::Timeframe;
use crate::types::{from_millis, round_to, Metric, Reading};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Decimal places applied to bucket statistics unless configured otherwise
pub const DEFAULT_ROUND_DECIMALS: u32 = 2;

// =============================================================================
// Output types
// =============================================================================

/// Shape of each bucket's value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AggregationMode {
    /// Mean only
    #[default]
    Simple,
    /// Mean, min, max, first and last
    Aggregated,
}

impl AggregationMode {
    /// Mode selected by the `aggregations` flag
    pub fn from_flag(aggregations: bool) -> Self {
        if aggregations {
            AggregationMode::Aggregated
        } else {
            AggregationMode::Simple
        }
    }
}

/// What readings are grouped by before bucketing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Grouping {
    #[default]
    Sensor,
    Room,
}

/// Group label carried on each row, serialized as a `sensor` or `room` field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    Sensor(String),
    Room(String),
}

impl GroupKey {
    /// The label regardless of variant
    pub fn name(&self) -> &str {
        match self {
            GroupKey::Sensor(name) | GroupKey::Room(name) => name,
        }
    }
}

/// Full statistics for one bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub first: f64,
    pub last: f64,
}

/// Bucket value, chosen once per query by [`AggregationMode`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BucketValue {
    Simple(f64),
    Aggregated(Summary),
}

impl BucketValue {
    /// Mean of the bucket in either mode
    pub fn mean(&self) -> f64 {
        match self {
            BucketValue::Simple(mean) => *mean,
            BucketValue::Aggregated(summary) => summary.mean,
        }
    }
}

/// One non-empty bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketRow {
    /// Bucket start
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub group: GroupKey,
    pub metric: Metric,
    pub value: BucketValue,
}

impl super::SensorLabel for BucketRow {
    fn sensor_label(&self) -> Option<&str> {
        match &self.group {
            GroupKey::Sensor(name) => Some(name),
            GroupKey::Room(_) => None,
        }
    }
}

// =============================================================================
// Accumulator
// =============================================================================

/// Ordering key for first/last: timestamp, then sensor, then value
#[derive(Debug, Clone, Copy)]
struct Sample<'a> {
    ts: i64,
    sensor: &'a str,
    value: f64,
}

impl Sample<'_> {
    fn order(&self, other: &Sample<'_>) -> Ordering {
        self.ts
            .cmp(&other.ts)
            .then_with(|| self.sensor.cmp(other.sensor))
            .then_with(|| self.value.total_cmp(&other.value))
    }
}

#[derive(Debug, Clone)]
struct BucketAccumulator<'a> {
    count: u64,
    sum: KahanSum,
    min: f64,
    max: f64,
    first: Sample<'a>,
    last: Sample<'a>,
}

impl<'a> BucketAccumulator<'a> {
    fn new(sample: Sample<'a>) -> Self {
        let mut sum = KahanSum::new();
        sum.add(sample.value);
        Self {
            count: 1,
            sum,
            min: sample.value,
            max: sample.value,
            first: sample,
            last: sample,
        }
    }

    fn update(&mut self, sample: Sample<'a>) {
        self.count += 1;
        self.sum.add(sample.value);
        self.min = self.min.min(sample.value);
        self.max = self.max.max(sample.value);
        if sample.order(&self.first) == Ordering::Less {
            self.first = sample;
        }
        if sample.order(&self.last) == Ordering::Greater {
            self.last = sample;
        }
    }

    fn finalize(&self, mode: AggregationMode, decimals: u32) -> BucketValue {
        let mean = round_to(self.sum.sum() / self.count as f64, decimals);
        match mode {
            AggregationMode::Simple => BucketValue::Simple(mean),
            AggregationMode::Aggregated => BucketValue::Aggregated(Summary {
                mean,
                min: round_to(self.min, decimals),
                max: round_to(self.max, decimals),
                first: round_to(self.first.value, decimals),
                last: round_to(self.last.value, decimals),
            }),
        }
    }
}

// =============================================================================
// Reducer
// =============================================================================

/// Buckets readings into fixed, epoch-aligned windows
#[derive(Debug, Clone, Copy)]
pub struct TimeframedReducer {
    timeframe: Timeframe,
    mode: AggregationMode,
    grouping: Grouping,
    decimals: u32,
}

impl TimeframedReducer {
    /// Simple-mode reducer grouped by sensor
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            mode: AggregationMode::Simple,
            grouping: Grouping::Sensor,
            decimals: DEFAULT_ROUND_DECIMALS,
        }
    }

    /// Set the aggregation mode
    pub fn with_mode(mut self, mode: AggregationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the grouping
    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    /// Set the rounding precision
    pub fn with_rounding(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    /// Bucket timeframe
    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Start of the bucket containing `ts`, in epoch milliseconds
    pub fn bucket_start_millis(&self, ts: DateTime<Utc>) -> i64 {
        let width = self.timeframe.bucket_width().num_milliseconds();
        ts.timestamp_millis().div_euclid(width) * width
    }

    /// Reduce readings to one row per non-empty bucket
    ///
    /// Room grouping reads labels from `rooms`; sensors missing from the map
    /// (or every sensor, when no map is given) fall into the `""` room.
    /// Rows are ordered by `(group, metric, bucket_start)`.
    pub fn reduce(&self, readings: &[Reading], rooms: Option<&RoomMap>) -> Vec<BucketRow> {
        let mut buckets: BTreeMap<(&str, &Metric, i64), BucketAccumulator<'_>> = BTreeMap::new();

        for reading in readings {
            let group = match (self.grouping, rooms) {
                (Grouping::Sensor, _) => reading.sensor.as_str(),
                (Grouping::Room, Some(map)) => map.room_for(&reading.sensor),
                (Grouping::Room, None) => "",
            };
            let sample = Sample {
                ts: reading.timestamp.timestamp_millis(),
                sensor: &reading.sensor,
                value: reading.value,
            };
            let bucket = self.bucket_start_millis(reading.timestamp);

            buckets
                .entry((group, &reading.metric, bucket))
                .and_modify(|acc| acc.update(sample))
                .or_insert_with(|| BucketAccumulator::new(sample));
        }

        tracing::trace!(
            readings = readings.len(),
            buckets = buckets.len(),
            timeframe = %self.timeframe,
            "Bucketed readings"
        );

        buckets
            .into_iter()
            .map(|((group, metric, bucket), acc)| BucketRow {
                timestamp: from_millis(bucket),
                group: match self.grouping {
                    Grouping::Sensor => GroupKey::Sensor(group.to_string()),
                    Grouping::Room => GroupKey::Room(group.to_string()),
                },
                metric: metric.clone(),
                value: acc.finalize(self.mode, self.decimals),
            })
            .collect()
    }
}
