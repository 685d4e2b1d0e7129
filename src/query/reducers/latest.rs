//! Latest reducer
//!
//! Keeps the most recent reading for every observed `(sensor, metric)` pair.
//! When two readings of a pair share the maximum timestamp, the one seen
//! later in the input wins.

use super::ReadingRow;
use crate::query::enrichment::RoomMap;
use crate::types::{Metric, Reading};
use std::collections::BTreeMap;

/// One row per `(sensor, metric)`, ordered by `(sensor, metric)`
pub fn latest(readings: &[Reading], rooms: Option<&RoomMap>) -> Vec<ReadingRow> {
    let mut newest: BTreeMap<(&str, &Metric), &Reading> = BTreeMap::new();

    for reading in readings {
        newest
            .entry((reading.sensor.as_str(), &reading.metric))
            .and_modify(|current| {
                if reading.timestamp >= current.timestamp {
                    *current = reading;
                }
            })
            .or_insert(reading);
    }

    newest
        .into_values()
        .map(|r| ReadingRow::project(r, rooms))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_one_row_per_pair_with_max_timestamp() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        let readings = vec![
            Reading::new(t0 + Duration::minutes(5), "A", Metric::Temperature, 22.0),
            Reading::new(t0, "A", Metric::Temperature, 21.0),
            Reading::new(t0, "A", Metric::Humidity, 50.0),
            Reading::new(t0 + Duration::minutes(1), "B", Metric::Temperature, 19.0),
        ];

        let rows = latest(&readings, None);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].sensor, "A");
        assert_eq!(rows[0].metric, Metric::Humidity);
        assert_eq!(rows[1].metric, Metric::Temperature);
        assert_eq!(rows[1].value, 22.0);
        assert_eq!(rows[2].sensor, "B");
    }

    #[test]
    fn test_timestamp_tie_keeps_later_seen() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        let readings = vec![
            Reading::new(ts, "A", Metric::Temperature, 21.0),
            Reading::new(ts, "A", Metric::Temperature, 23.0),
        ];
        let rows = latest(&readings, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 23.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(latest(&[], None).is_empty());
    }
}
