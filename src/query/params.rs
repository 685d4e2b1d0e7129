//! Query parameter parsing
//!
//! Parameters arrive as raw strings. Parsing is deliberately lenient: a
//! malformed date bound is dropped, a malformed boolean or page number falls
//! back to its default, and each case is logged as a warning. Only the
//! timeframe code and the overview interval are rejected outright, because
//! there is no reasonable value to substitute.

use crate::query::error::QueryError;
use crate::query::timeframe::Timeframe;
use crate::types::{Metric, TimeWindow};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::warn;

/// Query string as received from the caller
///
/// `sensors` keeps its plural name for compatibility, but only a single
/// sensor name is supported.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQueryParams {
    /// Inclusive lower bound (ISO-8601)
    #[serde(default)]
    pub start_date: Option<String>,
    /// Inclusive upper bound (ISO-8601)
    #[serde(default)]
    pub end_date: Option<String>,
    /// Exact sensor name
    #[serde(default)]
    pub sensors: Option<String>,
    /// Attach room labels / group by room
    #[serde(default)]
    pub include_room: Option<String>,
    /// Wrap the result in a metadata envelope
    #[serde(default)]
    pub metadata: Option<String>,
    /// Enable pagination (default true)
    #[serde(default)]
    pub paginate: Option<String>,
    /// 1-based page number
    #[serde(default)]
    pub page: Option<String>,
    /// Timeframe code for bucketed queries
    #[serde(default)]
    pub timeframe: Option<String>,
    /// Five-statistic summaries instead of plain means
    #[serde(default)]
    pub aggregations: Option<String>,
    /// Overview grid step (`30s`, `1m`, `5m`, `1h`, `1d`)
    #[serde(default)]
    pub interval: Option<String>,
    /// Overview metric restriction
    #[serde(default)]
    pub metric: Option<String>,
}

/// State of one date bound after parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateBound {
    /// Not supplied: the caller-specific default applies
    #[default]
    Absent,
    /// Parsed instant
    At(DateTime<Utc>),
    /// Supplied but unparsable: the bound is dropped
    Malformed,
}

/// Fully parsed query request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Lower bound
    pub start: DateBound,
    /// Upper bound
    pub end: DateBound,
    /// Exact sensor restriction
    pub sensor: Option<String>,
    /// Room enrichment / room grouping
    pub include_room: bool,
    /// Metadata envelope
    pub metadata: bool,
    /// Pagination on/off
    pub paginate: bool,
    /// 1-based page
    pub page: usize,
    /// Timeframe preset (bucketed queries only)
    pub timeframe: Timeframe,
    /// Aggregated vs simple mode
    pub aggregations: bool,
    /// Overview grid step; defaults to the timeframe's bucket width
    pub interval: Option<Duration>,
    /// Overview metric restriction
    pub metric: Option<Metric>,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            start: DateBound::Absent,
            end: DateBound::Absent,
            sensor: None,
            include_room: false,
            metadata: false,
            paginate: true,
            page: 1,
            timeframe: Timeframe::default(),
            aggregations: false,
            interval: None,
            metric: None,
        }
    }
}

impl QueryRequest {
    /// Parse raw parameters
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown timeframe code or an
    /// unparsable interval. Every other malformed value is recovered.
    pub fn from_raw(raw: &RawQueryParams) -> Result<Self, QueryError> {
        let timeframe = match non_empty(&raw.timeframe) {
            Some(code) => code.parse()?,
            None => Timeframe::default(),
        };

        let interval = non_empty(&raw.interval).map(parse_interval).transpose()?;

        Ok(Self {
            start: parse_date_bound("start_date", non_empty(&raw.start_date)),
            end: parse_date_bound("end_date", non_empty(&raw.end_date)),
            sensor: non_empty(&raw.sensors).map(str::to_string),
            include_room: parse_flag("include_room", non_empty(&raw.include_room), false),
            metadata: parse_flag("metadata", non_empty(&raw.metadata), false),
            paginate: parse_flag("paginate", non_empty(&raw.paginate), true),
            page: parse_page(non_empty(&raw.page)),
            timeframe,
            aggregations: parse_flag("aggregations", non_empty(&raw.aggregations), false),
            interval,
            metric: non_empty(&raw.metric).map(Metric::from),
        })
    }

    /// Resolve the effective window
    ///
    /// A missing end defaults to `now`; a missing start defaults to
    /// `end - lookback` (or `now - lookback` when the end was dropped).
    /// Malformed bounds leave that side of the window open, as does a
    /// lookback that would run past the earliest representable instant.
    pub fn window(&self, now: DateTime<Utc>, lookback: Duration) -> TimeWindow {
        let end = match self.end {
            DateBound::At(ts) => Some(ts),
            DateBound::Absent => Some(now),
            DateBound::Malformed => None,
        };

        let start = match self.start {
            DateBound::At(ts) => Some(ts),
            DateBound::Absent => end.unwrap_or(now).checked_sub_signed(lookback),
            DateBound::Malformed => None,
        };

        TimeWindow { start, end }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Individual parsers
// =============================================================================

/// Parse one date bound, logging and dropping it when malformed
pub fn parse_date_bound(name: &str, raw: Option<&str>) -> DateBound {
    match raw {
        None => DateBound::Absent,
        Some(value) => match parse_instant(value) {
            Some(ts) => DateBound::At(ts),
            None => {
                warn!(
                    parameter = name,
                    value = value,
                    "Ignoring malformed date bound"
                );
                DateBound::Malformed
            },
        },
    }
}

/// Parse an ISO-8601 instant
///
/// Accepts RFC 3339 with `Z` or an offset, naive datetimes (taken as UTC)
/// and bare dates (midnight UTC). A `+` in an offset that was decoded to a
/// space by URL decoding is restored first.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let restored = restore_offset_sign(value);
    let value = restored.as_deref().unwrap_or(value);

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(ts) = DateTime::parse_from_str(value, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `2025-01-06T12:00:00 03:00` → `2025-01-06T12:00:00+03:00`
fn restore_offset_sign(value: &str) -> Option<String> {
    if !value.contains('T') {
        return None;
    }
    let (head, tail) = value.rsplit_once(' ')?;
    let offset = tail.as_bytes();
    let looks_like_offset = !head.is_empty()
        && offset.len() == 5
        && offset
            .iter()
            .enumerate()
            .all(|(i, b)| if i == 2 { *b == b':' } else { b.is_ascii_digit() });
    looks_like_offset.then(|| format!("{}+{}", head, tail))
}

/// Parse a boolean flag, falling back to `default` when malformed
pub fn parse_flag(name: &str, raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None => default,
        Some("true" | "1" | "yes" | "on") => true,
        Some("false" | "0" | "no" | "off") => false,
        Some(other) => {
            warn!(
                parameter = name,
                value = other,
                default = default,
                "Ignoring malformed boolean parameter"
            );
            default
        },
    }
}

/// Parse a 1-based page number, falling back to the first page
pub fn parse_page(raw: Option<&str>) -> usize {
    match raw.map(str::parse::<usize>) {
        None => 1,
        Some(Ok(page)) if page >= 1 => page,
        Some(_) => {
            warn!(value = raw.unwrap_or_default(), "Ignoring malformed page number");
            1
        },
    }
}

/// Parse an interval like `30s`, `5m`, `1h` or `1d`
///
/// `t` is accepted as a minute suffix, matching the timeframe codes.
pub fn parse_interval(raw: &str) -> Result<Duration, QueryError> {
    let interval = raw.trim().to_ascii_lowercase();
    let invalid = || QueryError::validation(format!("invalid interval '{}'", raw));

    let Some((unit_idx, unit)) = interval.char_indices().last() else {
        return Err(invalid());
    };
    let num: i64 = interval[..unit_idx].parse().map_err(|_| invalid())?;
    if num <= 0 {
        return Err(invalid());
    }

    let step = match unit {
        's' => Duration::try_seconds(num),
        'm' | 't' => Duration::try_minutes(num),
        'h' => Duration::try_hours(num),
        'd' => Duration::try_days(num),
        _ => None,
    };
    step.ok_or_else(invalid)
}
