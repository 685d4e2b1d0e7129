//! Gap-fill resampler - regular grids for chart rendering
//!
//! Turns an irregular `(timestamp, value)` series into a gap-free series on
//! a fixed grid:
//!
//! 1. **Grid**: from the minute floor of the first sample to the minute
//!    ceiling of the last, stepping by the interval
//! 2. **Placement**: each sample lands in the slot containing it; slots with
//!    several samples take their mean
//! 3. **Interpolation**: interior gaps are filled linearly by position
//! 4. **Edge extension**: leading and trailing gaps copy the nearest value
//! 5. **Rounding**: one decimal unless configured otherwise
//!
//! Output is for rendering only and is never fed back into aggregation.

use crate::query::error::QueryError;
use crate::types::{from_millis, round_to, Metric};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Decimal places applied to resampled values unless configured otherwise
pub const DEFAULT_ROUND_DECIMALS: u32 = 1;

/// Upper limit on grid points per series
///
/// A one-second interval over a year-long window would otherwise allocate
/// tens of millions of slots.
pub const MAX_GRID_POINTS: usize = 50_000;

const MINUTE_MILLIS: i64 = 60_000;

/// One point on the resampled grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Resampled series for one `(sensor, metric)` pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewSeries {
    pub sensor: String,
    pub metric: Metric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub points: Vec<SeriesPoint>,
}

impl crate::query::reducers::SensorLabel for OverviewSeries {
    fn sensor_label(&self) -> Option<&str> {
        Some(&self.sensor)
    }
}

/// Truncate to the start of the minute
pub fn floor_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    from_millis(ts.timestamp_millis().div_euclid(MINUTE_MILLIS) * MINUTE_MILLIS)
}

/// Round up to the next whole minute; whole minutes are unchanged
pub fn ceil_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    let ms = ts.timestamp_millis();
    let floored = ms.div_euclid(MINUTE_MILLIS) * MINUTE_MILLIS;
    if floored == ms {
        ts
    } else {
        from_millis(floored + MINUTE_MILLIS)
    }
}

/// Fixed-step gap-filling resampler
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    step_millis: i64,
    decimals: u32,
    max_points: usize,
}

impl Resampler {
    /// Create a resampler for the given grid step
    ///
    /// # Errors
    ///
    /// Returns a validation error when the step is not strictly positive.
    pub fn new(step: Duration) -> Result<Self, QueryError> {
        let step_millis = step.num_milliseconds();
        if step_millis <= 0 {
            return Err(QueryError::validation(format!(
                "Resample interval must be positive, got {}ms",
                step_millis
            )));
        }
        Ok(Self {
            step_millis,
            decimals: DEFAULT_ROUND_DECIMALS,
            max_points: MAX_GRID_POINTS,
        })
    }

    /// Set the rounding precision
    pub fn with_rounding(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    /// Set the grid size limit
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    /// Resample a series
    ///
    /// Input order does not matter. Returns `Ok(None)` for an empty series.
    ///
    /// # Errors
    ///
    /// Returns a resource-limit error when the grid would exceed the
    /// configured number of points.
    pub fn resample(
        &self,
        series: &[(DateTime<Utc>, f64)],
    ) -> Result<Option<Vec<SeriesPoint>>, QueryError> {
        let (Some(min_ts), Some(max_ts)) = (
            series.iter().map(|(ts, _)| *ts).min(),
            series.iter().map(|(ts, _)| *ts).max(),
        ) else {
            return Ok(None);
        };

        let start = floor_to_minute(min_ts).timestamp_millis();
        let end = ceil_to_minute(max_ts).timestamp_millis();
        let slots = ((end - start) / self.step_millis) as usize + 1;

        if slots > self.max_points {
            return Err(QueryError::resource_limit(format!(
                "Resampling would produce {} points (limit {}); \
                 use a coarser interval or a narrower date range",
                slots, self.max_points
            )));
        }

        // Placement: mean of the samples falling into each slot
        let mut sums = vec![0.0f64; slots];
        let mut counts = vec![0u32; slots];
        for (ts, value) in series {
            let slot = ((ts.timestamp_millis() - start) / self.step_millis) as usize;
            let slot = slot.min(slots - 1);
            sums[slot] += value;
            counts[slot] += 1;
        }

        let mut values: Vec<Option<f64>> = sums
            .iter()
            .zip(&counts)
            .map(|(&sum, &count)| (count > 0).then(|| sum / count as f64))
            .collect();

        fill_gaps(&mut values);

        let points = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint {
                timestamp: from_millis(start + i as i64 * self.step_millis),
                value: round_to(v.unwrap_or(f64::NAN), self.decimals),
            })
            .collect();

        Ok(Some(points))
    }
}

/// Linear interpolation between defined slots, then constant extension
/// at both ends. Leaves the slice untouched when nothing is defined.
fn fill_gaps(values: &mut [Option<f64>]) {
    let defined: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();

    let (Some(&first), Some(&last)) = (defined.first(), defined.last()) else {
        return;
    };

    for pair in defined.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let (Some(v_lo), Some(v_hi)) = (values[lo], values[hi]) else {
            continue;
        };
        let span = (hi - lo) as f64;
        for (offset, slot) in values[lo + 1..hi].iter_mut().enumerate() {
            let frac = (offset + 1) as f64 / span;
            *slot = Some(v_lo + (v_hi - v_lo) * frac);
        }
    }

    let head = values[first];
    for v in &mut values[..first] {
        *v = head;
    }
    let tail = values[last];
    for v in &mut values[last + 1..] {
        *v = tail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, h, m, s).unwrap()
    }

    fn values(points: &[SeriesPoint]) -> Vec<f64> {
        points.iter().map(|p| p.value).collect()
    }

    #[test]
    fn test_linear_fill_between_samples() {
        let resampler = Resampler::new(Duration::minutes(1)).unwrap();
        let points = resampler
            .resample(&[(at(10, 0, 0), 21.0), (at(10, 5, 0), 23.0)])
            .unwrap()
            .unwrap();

        assert_eq!(points.len(), 6);
        assert_eq!(points[0].timestamp, at(10, 0, 0));
        assert_eq!(points[5].timestamp, at(10, 5, 0));
        assert_eq!(values(&points), vec![21.0, 21.4, 21.8, 22.2, 22.6, 23.0]);
    }

    #[test]
    fn test_grid_spans_minute_floor_to_ceiling() {
        let resampler = Resampler::new(Duration::seconds(30)).unwrap();
        let points = resampler
            .resample(&[(at(10, 0, 20), 10.0), (at(10, 1, 10), 20.0)])
            .unwrap()
            .unwrap();

        assert_eq!(points.first().unwrap().timestamp, at(10, 0, 0));
        assert_eq!(points.last().unwrap().timestamp, at(10, 2, 0));
        assert_eq!(points.len(), 5);
        // slot 0 holds 10.0, slot 2 holds 20.0, the rest is filled
        assert_eq!(values(&points), vec![10.0, 15.0, 20.0, 20.0, 20.0]);
    }

    #[test]
    fn test_samples_sharing_a_slot_are_averaged() {
        let resampler = Resampler::new(Duration::minutes(5)).unwrap();
        let points = resampler
            .resample(&[(at(10, 1, 0), 20.0), (at(10, 3, 0), 22.0)])
            .unwrap()
            .unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].timestamp, at(10, 1, 0));
        assert_eq!(points[0].value, 21.0);
    }

    #[test]
    fn test_single_sample_extends_to_whole_grid() {
        let resampler = Resampler::new(Duration::seconds(20)).unwrap();
        let points = resampler
            .resample(&[(at(10, 0, 30), 55.0)])
            .unwrap()
            .unwrap();

        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| p.value == 55.0));
    }

    #[test]
    fn test_empty_series_is_omitted() {
        let resampler = Resampler::new(Duration::minutes(1)).unwrap();
        assert!(resampler.resample(&[]).unwrap().is_none());
    }

    #[test]
    fn test_unordered_input() {
        let resampler = Resampler::new(Duration::minutes(1)).unwrap();
        let points = resampler
            .resample(&[(at(10, 2, 0), 30.0), (at(10, 0, 0), 10.0)])
            .unwrap()
            .unwrap();
        assert_eq!(values(&points), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_non_positive_step_rejected() {
        assert!(Resampler::new(Duration::zero()).is_err());
        assert!(Resampler::new(Duration::seconds(-5)).is_err());
    }

    #[test]
    fn test_grid_limit() {
        let resampler = Resampler::new(Duration::seconds(1))
            .unwrap()
            .with_max_points(100);
        let err = resampler
            .resample(&[(at(10, 0, 0), 1.0), (at(11, 0, 0), 2.0)])
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(err.message.contains("3601 points (limit 100)"));
        assert!(err.message.contains("coarser interval"));
    }

    #[test]
    fn test_minute_helpers() {
        assert_eq!(floor_to_minute(at(10, 4, 59)), at(10, 4, 0));
        assert_eq!(ceil_to_minute(at(10, 4, 1)), at(10, 5, 0));
        assert_eq!(ceil_to_minute(at(10, 4, 0)), at(10, 4, 0));
    }

    #[test]
    fn test_custom_rounding() {
        let resampler = Resampler::new(Duration::minutes(1))
            .unwrap()
            .with_rounding(2);
        let points = resampler
            .resample(&[(at(10, 0, 0), 0.0), (at(10, 3, 0), 1.0)])
            .unwrap()
            .unwrap();
        assert_eq!(values(&points), vec![0.0, 0.33, 0.67, 1.0]);
    }
}
