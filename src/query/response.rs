//! Response assembler - pagination and metadata envelope
//!
//! Shapes reducer output for the wire:
//!
//! - no pagination, no metadata: a bare JSON array of rows
//! - otherwise: `{metadata?, count, page, page_size, total_pages, results}`
//!   with the pagination fields present only when paginating
//!
//! A page past the end yields an empty `results` list rather than an error.

use crate::query::params::QueryRequest;
use crate::query::reducers::SensorLabel;
use crate::query::timeframe::Timeframe;
use crate::types::TimeWindow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration as StdDuration;

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Presentation options for one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseOptions {
    pub paginate: bool,
    /// 1-based page
    pub page: usize,
    pub page_size: usize,
    pub metadata: bool,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self {
            paginate: true,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            metadata: false,
        }
    }
}

impl ResponseOptions {
    /// Options requested by the caller, with the configured page size
    pub fn from_request(request: &QueryRequest, page_size: usize) -> Self {
        Self {
            paginate: request.paginate,
            page: request.page.max(1),
            page_size: page_size.max(1),
            metadata: request.metadata,
        }
    }
}

/// Metadata envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMetadata {
    /// Effective lower bound, `null` when unbounded
    pub start_date: Option<DateTime<Utc>>,
    /// Effective upper bound, `null` when unbounded
    pub end_date: Option<DateTime<Utc>>,
    pub query_duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
    /// Rows before pagination
    pub record_count: usize,
    /// Sorted distinct sensor names in the result
    pub sensors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_minutes: Option<i64>,
    /// Distinct group keys (bucketed queries only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<usize>,
}

impl QueryMetadata {
    /// Metadata for a window; row-derived fields are filled by [`assemble`]
    pub fn new(window: &TimeWindow, elapsed: StdDuration) -> Self {
        Self {
            start_date: window.start,
            end_date: window.end,
            query_duration_ms: (elapsed.as_secs_f64() * 1000.0 * 1000.0).round() / 1000.0,
            timeframe: None,
            record_count: 0,
            sensors: Vec::new(),
            window_minutes: None,
            groups: None,
        }
    }

    /// Attach the bucket timeframe
    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = Some(timeframe);
        self
    }

    /// Attach the window length in minutes (when bounded)
    pub fn with_window_minutes(mut self, window: &TimeWindow) -> Self {
        self.window_minutes = window.duration().map(|d| d.num_minutes());
        self
    }

    /// Attach the number of distinct groups
    pub fn with_groups(mut self, groups: usize) -> Self {
        self.groups = Some(groups);
        self
    }
}

/// Pagination fields of the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    /// Total rows across all pages
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Object form of a response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<QueryMetadata>,
    #[serde(flatten)]
    pub page: Option<PageInfo>,
    pub results: Vec<T>,
}

/// Assembled response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResponse<T> {
    /// Bare array
    Rows(Vec<T>),
    /// Paginated and/or metadata-wrapped
    Envelope(Envelope<T>),
}

impl<T> QueryResponse<T> {
    /// Rows in this response (the current page when paginated)
    pub fn results(&self) -> &[T] {
        match self {
            QueryResponse::Rows(rows) => rows,
            QueryResponse::Envelope(envelope) => &envelope.results,
        }
    }

    /// Metadata, when requested
    pub fn metadata(&self) -> Option<&QueryMetadata> {
        match self {
            QueryResponse::Rows(_) => None,
            QueryResponse::Envelope(envelope) => envelope.metadata.as_ref(),
        }
    }

    /// Pagination details, when paginated
    pub fn page_info(&self) -> Option<&PageInfo> {
        match self {
            QueryResponse::Rows(_) => None,
            QueryResponse::Envelope(envelope) => envelope.page.as_ref(),
        }
    }
}

/// Shape rows into a response
///
/// `metadata` is only attached when the options ask for it; its
/// `record_count` and `sensors` fields are computed here from the full
/// (unpaginated) rows.
pub fn assemble<T: SensorLabel>(
    rows: Vec<T>,
    options: &ResponseOptions,
    metadata: QueryMetadata,
) -> QueryResponse<T> {
    if !options.paginate && !options.metadata {
        return QueryResponse::Rows(rows);
    }

    let metadata = options.metadata.then(|| {
        let sensors: BTreeSet<&str> = rows.iter().filter_map(|r| r.sensor_label()).collect();
        QueryMetadata {
            record_count: rows.len(),
            sensors: sensors.into_iter().map(str::to_string).collect(),
            ..metadata
        }
    });

    if !options.paginate {
        return QueryResponse::Envelope(Envelope {
            metadata,
            page: None,
            results: rows,
        });
    }

    let count = rows.len();
    let page_size = options.page_size.max(1);
    let page = options.page.max(1);
    let total_pages = count.div_ceil(page_size).max(1);

    let results: Vec<T> = rows
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .collect();

    QueryResponse::Envelope(Envelope {
        metadata,
        page: Some(PageInfo {
            count,
            page,
            page_size,
            total_pages,
        }),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::reducers::ReadingRow;
    use crate::types::Metric;
    use chrono::TimeZone;

    fn rows(n: usize) -> Vec<ReadingRow> {
        let ts = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        (0..n)
            .map(|i| ReadingRow {
                timestamp: ts,
                sensor: format!("s{}", i % 3),
                metric: Metric::Temperature,
                value: i as f64,
                room: None,
            })
            .collect()
    }

    fn meta() -> QueryMetadata {
        QueryMetadata::new(&TimeWindow::unbounded(), StdDuration::from_millis(3))
    }

    #[test]
    fn test_bare_array_without_pagination_or_metadata() {
        let options = ResponseOptions {
            paginate: false,
            ..Default::default()
        };
        let response = assemble(rows(5), &options, meta());
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_pagination_slices_pages() {
        let options = ResponseOptions {
            page: 2,
            page_size: 2,
            ..Default::default()
        };
        let response = assemble(rows(5), &options, meta());
        let info = response.page_info().unwrap();
        assert_eq!(info.count, 5);
        assert_eq!(info.total_pages, 3);
        assert_eq!(response.results().len(), 2);
        assert_eq!(response.results()[0].value, 2.0);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["count"], 5);
        assert_eq!(json["page"], 2);
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let options = ResponseOptions {
            page: 9,
            page_size: 2,
            ..Default::default()
        };
        let response = assemble(rows(5), &options, meta());
        assert!(response.results().is_empty());
        assert_eq!(response.page_info().unwrap().count, 5);
    }

    #[test]
    fn test_metadata_without_pagination() {
        let options = ResponseOptions {
            paginate: false,
            metadata: true,
            ..Default::default()
        };
        let response = assemble(rows(4), &options, meta());
        let metadata = response.metadata().unwrap();
        assert_eq!(metadata.record_count, 4);
        assert_eq!(metadata.sensors, vec!["s0", "s1", "s2"]);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("count").is_none());
        assert!(json["metadata"]["start_date"].is_null());
        assert_eq!(json["results"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_empty_rows() {
        let response = assemble(Vec::<ReadingRow>::new(), &ResponseOptions::default(), meta());
        assert!(response.results().is_empty());
        assert_eq!(response.page_info().unwrap().total_pages, 1);
    }
}
