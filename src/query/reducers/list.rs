//! List reducer

use super::ReadingRow;
use crate::query::enrichment::RoomMap;
use crate::types::Reading;

/// Project every reading to a row, newest first
///
/// Ties on timestamp fall back to `(sensor, metric)` so that page boundaries
/// are stable between identical requests.
pub fn list(readings: &[Reading], rooms: Option<&RoomMap>) -> Vec<ReadingRow> {
    let mut sorted: Vec<&Reading> = readings.iter().collect();
    sorted.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.sensor.cmp(&b.sensor))
            .then_with(|| a.metric.cmp(&b.metric))
    });

    sorted
        .into_iter()
        .map(|r| ReadingRow::project(r, rooms))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Metric, SensorAssignment};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_newest_first_with_stable_ties() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 1, 6, 11, 0, 0).unwrap();
        let readings = vec![
            Reading::new(t0, "B", Metric::Temperature, 20.0),
            Reading::new(t1, "B", Metric::Humidity, 60.0),
            Reading::new(t1, "A", Metric::Temperature, 21.0),
            Reading::new(t1, "A", Metric::Humidity, 61.0),
        ];

        let rows = list(&readings, None);
        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.timestamp, r.sensor.as_str(), r.metric.code().to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (t1, "A", "h".to_string()),
                (t1, "A", "t".to_string()),
                (t1, "B", "h".to_string()),
                (t0, "B", "t".to_string()),
            ]
        );
        assert!(rows.iter().all(|r| r.room.is_none()));
    }

    #[test]
    fn test_room_attached_when_requested() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        let rooms = RoomMap::from_assignments(vec![SensorAssignment::new("A", "vegetativo")]);
        let readings = vec![
            Reading::new(ts, "A", Metric::Temperature, 20.0),
            Reading::new(ts, "Z", Metric::Temperature, 22.0),
        ];

        let rows = list(&readings, Some(&rooms));
        assert_eq!(rows[0].room.as_deref(), Some("vegetativo"));
        assert_eq!(rows[1].room.as_deref(), Some(""));
    }
}
