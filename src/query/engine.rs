//! Query engine - wires collaborators, filter, reducers and assembler
//!
//! Each public method is one stateless pipeline:
//!
//! ```text
//! QueryRequest
//!      │
//!      ▼
//! ┌──────────────┐
//! │ ReadingStore │  candidate readings for the window
//! └──────────────┘
//!      │
//!      ▼
//! ┌──────────────┐
//! │ QueryFilter  │  window, sensor, range validator
//! └──────────────┘
//!      │
//!      ▼
//! ┌──────────────┐
//! │   Reducer    │  list / latest / timeframed (+ resample)
//! └──────────────┘
//!      │
//!      ▼
//! ┌──────────────┐
//! │  Assembler   │  pagination, metadata envelope
//! └──────────────┘
//! ```
//!
//! The registry is consulted only when room enrichment is requested.

use crate::config::Config;
use crate::engine::traits::{ReadingStore, Registry};
use crate::error::{Error, Result};
use crate::metrics;
use crate::query::enrichment::RoomMap;
use crate::query::filter::{FilterParams, QueryFilter};
use crate::query::params::QueryRequest;
use crate::query::reducers::{
    self, AggregationMode, BucketRow, Grouping, ReadingRow, TimeframedReducer,
};
use crate::query::resample::{OverviewSeries, Resampler};
use crate::query::response::{assemble, QueryMetadata, QueryResponse, ResponseOptions};
use crate::query::validator::ValidRanges;
use crate::types::{Metric, Reading, TimeWindow};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Source of "now" for default windows
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// =============================================================================
// Settings
// =============================================================================

/// Engine tunables derived from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Rows per page
    pub page_size: usize,
    /// Default lookback for list and latest queries
    pub default_window: Duration,
    /// Decimals for bucket statistics
    pub aggregate_decimals: u32,
    /// Decimals for resampled overview points
    pub overview_decimals: u32,
    /// Range validator table
    pub ranges: ValidRanges,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EngineSettings {
    /// Extract engine settings from the full configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.query.page_size,
            default_window: Duration::hours(config.query.default_window_hours),
            aggregate_decimals: config.query.aggregate_round_decimals,
            overview_decimals: config.query.overview_round_decimals,
            ranges: config.validation.clone(),
        }
    }
}

// =============================================================================
// QueryEngine
// =============================================================================

/// Read-only query engine over a reading store and a sensor registry
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn ReadingStore>,
    registry: Arc<dyn Registry>,
    settings: EngineSettings,
    clock: Clock,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("store", &self.store.store_id())
            .field("registry", &self.registry.registry_id())
            .field("settings", &self.settings)
            .finish()
    }
}

impl QueryEngine {
    /// Create an engine with default settings and the system clock
    pub fn new(store: Arc<dyn ReadingStore>, registry: Arc<dyn Registry>) -> Self {
        Self {
            store,
            registry,
            settings: EngineSettings::default(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the settings
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the clock used for default windows
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Active settings
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // -------------------------------------------------------------------------
    // Public pipelines
    // -------------------------------------------------------------------------

    /// Every valid reading in the window, newest first
    pub async fn list(&self, request: &QueryRequest) -> Result<QueryResponse<ReadingRow>> {
        observe("list", async {
            let started = Instant::now();
            let window = request.window((self.clock)(), self.settings.default_window);
            let readings = self.fetch(&window, request).await?;
            let rooms = self.rooms(request.include_room).await?;

            let rows = reducers::list(&readings, rooms.as_ref());
            tracing::debug!(
                readings = readings.len(),
                rows = rows.len(),
                "List query complete"
            );

            let metadata = QueryMetadata::new(&window, started.elapsed());
            Ok::<_, Error>(assemble(rows, &self.options(request), metadata))
        })
        .await
    }

    /// Most recent valid reading per `(sensor, metric)`
    pub async fn latest(&self, request: &QueryRequest) -> Result<QueryResponse<ReadingRow>> {
        observe("latest", async {
            let started = Instant::now();
            let window = request.window((self.clock)(), self.settings.default_window);
            let readings = self.fetch(&window, request).await?;
            let rooms = self.rooms(request.include_room).await?;

            let rows = reducers::latest(&readings, rooms.as_ref());
            tracing::debug!(
                readings = readings.len(),
                rows = rows.len(),
                "Latest query complete"
            );

            let metadata = QueryMetadata::new(&window, started.elapsed());
            Ok::<_, Error>(assemble(rows, &self.options(request), metadata))
        })
        .await
    }

    /// Bucket statistics at the requested timeframe
    ///
    /// With `include_room`, rows are grouped by room instead of sensor.
    pub async fn timeframed(&self, request: &QueryRequest) -> Result<QueryResponse<BucketRow>> {
        observe("timeframed", async {
            let started = Instant::now();
            let timeframe = request.timeframe;
            let window = request.window((self.clock)(), timeframe.lookback());
            let readings = self.fetch(&window, request).await?;
            let rooms = self.rooms(request.include_room).await?;

            let grouping = if request.include_room {
                Grouping::Room
            } else {
                Grouping::Sensor
            };
            let rows = TimeframedReducer::new(timeframe)
                .with_mode(AggregationMode::from_flag(request.aggregations))
                .with_grouping(grouping)
                .with_rounding(self.settings.aggregate_decimals)
                .reduce(&readings, rooms.as_ref());

            let groups = rows.iter().map(|r| &r.group).collect::<BTreeSet<_>>().len();
            tracing::debug!(
                readings = readings.len(),
                buckets = rows.len(),
                groups,
                timeframe = %timeframe,
                "Timeframed query complete"
            );

            let metadata = QueryMetadata::new(&window, started.elapsed())
                .with_timeframe(timeframe)
                .with_window_minutes(&window)
                .with_groups(groups);
            Ok::<_, Error>(assemble(rows, &self.options(request), metadata))
        })
        .await
    }

    /// Gap-free per-sensor series for charting
    ///
    /// Buckets each sensor at the timeframe, then resamples every
    /// `(sensor, metric)` series at `interval` (default: the bucket width).
    pub async fn overview(
        &self,
        request: &QueryRequest,
    ) -> Result<QueryResponse<OverviewSeries>> {
        observe("overview", async {
            let started = Instant::now();
            let timeframe = request.timeframe;
            let interval = request.interval.unwrap_or_else(|| timeframe.bucket_width());
            let resampler =
                Resampler::new(interval)?.with_rounding(self.settings.overview_decimals);

            let window = request.window((self.clock)(), timeframe.lookback());
            let mut readings = self.fetch(&window, request).await?;
            if let Some(metric) = &request.metric {
                readings.retain(|r| &r.metric == metric);
            }
            let rooms = self.rooms(request.include_room).await?;

            let buckets = TimeframedReducer::new(timeframe)
                .with_rounding(self.settings.aggregate_decimals)
                .reduce(&readings, None);

            let mut grouped: BTreeMap<(String, Metric), Vec<(DateTime<Utc>, f64)>> =
                BTreeMap::new();
            for row in buckets {
                grouped
                    .entry((row.group.name().to_string(), row.metric))
                    .or_default()
                    .push((row.timestamp, row.value.mean()));
            }

            let mut series = Vec::with_capacity(grouped.len());
            for ((sensor, metric), points) in grouped {
                let Some(points) = resampler.resample(&points)? else {
                    continue;
                };
                let room = rooms.as_ref().map(|m| m.room_for(&sensor).to_string());
                series.push(OverviewSeries {
                    sensor,
                    metric,
                    room,
                    points,
                });
            }

            tracing::debug!(
                readings = readings.len(),
                series = series.len(),
                timeframe = %timeframe,
                interval_secs = interval.num_seconds(),
                "Overview query complete"
            );

            let metadata = QueryMetadata::new(&window, started.elapsed())
                .with_timeframe(timeframe)
                .with_window_minutes(&window);
            Ok::<_, Error>(assemble(series, &self.options(request), metadata))
        })
        .await
    }

    // -------------------------------------------------------------------------
    // Pipeline stages
    // -------------------------------------------------------------------------

    async fn fetch(&self, window: &TimeWindow, request: &QueryRequest) -> Result<Vec<Reading>> {
        let sensor = request.sensor.as_deref();
        let candidates = self.store.query(window, sensor).await?;
        let fetched = candidates.len();

        let filter = QueryFilter::new(&self.settings.ranges);
        let params = FilterParams::new(*window, request.sensor.clone());
        let readings = filter.apply(candidates, &params);

        tracing::trace!(
            store = self.store.store_id(),
            fetched,
            kept = readings.len(),
            "Filtered candidate readings"
        );
        Ok(readings)
    }

    async fn rooms(&self, include_room: bool) -> Result<Option<RoomMap>> {
        if !include_room {
            return Ok(None);
        }
        Ok(Some(RoomMap::load(self.registry.as_ref()).await?))
    }

    fn options(&self, request: &QueryRequest) -> ResponseOptions {
        ResponseOptions::from_request(request, self.settings.page_size)
    }
}

/// Run a pipeline, recording its outcome and latency
async fn observe<T, F>(reducer: &'static str, pipeline: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = pipeline.await;
    metrics::record_query(reducer, result.is_ok(), started.elapsed().as_secs_f64());
    if let Err(e) = &result {
        tracing::warn!(reducer, error = %e, "Query failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{MemoryReadingStore, MemoryRegistry};
    use crate::query::reducers::{BucketValue, GroupKey};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, h, m, 0).unwrap()
    }

    fn engine(readings: Vec<Reading>) -> QueryEngine {
        let registry = MemoryRegistry::new();
        registry.assign("A", "vegetativo");
        QueryEngine::new(
            Arc::new(MemoryReadingStore::with_readings(readings)),
            Arc::new(registry),
        )
        .with_clock(Arc::new(|| at(12, 0)))
    }

    fn bare() -> QueryRequest {
        QueryRequest {
            paginate: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_uses_default_window() {
        let engine = engine(vec![
            Reading::new(at(11, 0), "A", Metric::Temperature, 20.0),
            Reading::new(at(11, 0) - Duration::days(2), "A", Metric::Temperature, 20.0),
        ]);
        let response = engine.list(&bare()).await.unwrap();
        assert_eq!(response.results().len(), 1);
    }

    #[tokio::test]
    async fn test_timeframed_room_grouping() {
        let engine = engine(vec![
            Reading::new(at(11, 10), "A", Metric::Temperature, 20.0),
            Reading::new(at(11, 20), "B", Metric::Temperature, 30.0),
        ]);
        let request = QueryRequest {
            include_room: true,
            ..bare()
        };
        let response = engine.timeframed(&request).await.unwrap();
        let rows = response.results();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].group, GroupKey::Room("".into()));
        assert_eq!(rows[1].group, GroupKey::Room("vegetativo".into()));
        assert_eq!(rows[1].value, BucketValue::Simple(20.0));
    }

    #[tokio::test]
    async fn test_overview_resamples_bucket_means() {
        let engine = engine(vec![
            Reading::new(at(9, 10), "A", Metric::Temperature, 20.0),
            Reading::new(at(9, 50), "A", Metric::Temperature, 22.0),
            Reading::new(at(11, 5), "A", Metric::Temperature, 25.0),
            Reading::new(at(11, 5), "A", Metric::Humidity, 55.0),
        ]);
        let request = QueryRequest {
            metric: Some(Metric::Temperature),
            include_room: true,
            ..bare()
        };
        let response = engine.overview(&request).await.unwrap();
        let series = response.results();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].room.as_deref(), Some("vegetativo"));

        let values: Vec<f64> = series[0].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![21.0, 23.0, 25.0]);
    }

    #[tokio::test]
    async fn test_overview_rejects_oversized_grid() {
        let engine = engine(vec![
            Reading::new(at(0, 0), "A", Metric::Temperature, 20.0),
            Reading::new(at(11, 0), "A", Metric::Temperature, 22.0),
        ]);
        let request = QueryRequest {
            timeframe: crate::query::Timeframe::OneMinute,
            interval: Some(Duration::milliseconds(100)),
            start: crate::query::params::DateBound::At(at(0, 0)),
            ..bare()
        };
        assert!(engine.overview(&request).await.is_err());
    }
}
