//! Timeframe presets for bucketed queries
//!
//! Each code fixes two durations: the width of one output bucket and how far
//! back to look when the caller gives no start date.
//!
//! | code | bucket | lookback |
//! |------|--------|----------|
//! | 5S   | 5 s    | 5 min    |
//! | 1T   | 1 min  | 15 min   |
//! | 30T  | 30 min | 12 h     |
//! | 1H   | 1 h    | 24 h     |
//! | 4H   | 4 h    | 4 days   |
//! | 1D   | 1 day  | 7 days   |

use crate::query::error::QueryError;
use chrono::Duration;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Bucket width / lookback preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeframe {
    /// `5S`
    FiveSeconds,
    /// `1T`
    OneMinute,
    /// `30T`
    ThirtyMinutes,
    /// `1H`
    #[default]
    OneHour,
    /// `4H`
    FourHours,
    /// `1D`
    OneDay,
}

impl Timeframe {
    /// Every preset, finest first
    pub const ALL: [Timeframe; 6] = [
        Timeframe::FiveSeconds,
        Timeframe::OneMinute,
        Timeframe::ThirtyMinutes,
        Timeframe::OneHour,
        Timeframe::FourHours,
        Timeframe::OneDay,
    ];

    /// Canonical code
    pub fn code(&self) -> &'static str {
        match self {
            Timeframe::FiveSeconds => "5S",
            Timeframe::OneMinute => "1T",
            Timeframe::ThirtyMinutes => "30T",
            Timeframe::OneHour => "1H",
            Timeframe::FourHours => "4H",
            Timeframe::OneDay => "1D",
        }
    }

    /// Duration of one output bucket
    pub fn bucket_width(&self) -> Duration {
        match self {
            Timeframe::FiveSeconds => Duration::seconds(5),
            Timeframe::OneMinute => Duration::minutes(1),
            Timeframe::ThirtyMinutes => Duration::minutes(30),
            Timeframe::OneHour => Duration::hours(1),
            Timeframe::FourHours => Duration::hours(4),
            Timeframe::OneDay => Duration::days(1),
        }
    }

    /// Window used when no explicit start date is given
    pub fn lookback(&self) -> Duration {
        match self {
            Timeframe::FiveSeconds => Duration::minutes(5),
            Timeframe::OneMinute => Duration::minutes(15),
            Timeframe::ThirtyMinutes => Duration::hours(12),
            Timeframe::OneHour => Duration::hours(24),
            Timeframe::FourHours => Duration::days(4),
            Timeframe::OneDay => Duration::days(7),
        }
    }
}

impl FromStr for Timeframe {
    type Err = QueryError;

    /// Parse a timeframe code, case-insensitively
    ///
    /// `1MIN` and `30MIN` are accepted as aliases of `1T` and `30T`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "5S" => Ok(Timeframe::FiveSeconds),
            "1T" | "1MIN" => Ok(Timeframe::OneMinute),
            "30T" | "30MIN" => Ok(Timeframe::ThirtyMinutes),
            "1H" => Ok(Timeframe::OneHour),
            "4H" => Ok(Timeframe::FourHours),
            "1D" => Ok(Timeframe::OneDay),
            other => Err(QueryError::validation(format!(
                "unknown timeframe '{}', expected one of 5S, 1T, 30T, 1H, 4H, 1D",
                other
            ))),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Timeframe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}
