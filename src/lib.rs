//! Canopy - query and aggregation engine for grow-room sensor readings
//!
//! This library serves time-series readings (temperature, humidity,
//! substrate moisture, light) collected from sensors placed in rooms:
//! - Range validation that drops physically implausible values
//! - Raw listing and latest-value queries
//! - Epoch-aligned bucket statistics at fixed timeframes
//! - Gap-filled, resampled series for dashboard charts
//! - Optional pagination and metadata envelopes

#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Prometheus metrics and telemetry
pub mod metrics;

/// Query pipeline: parameters, filter, reducers, resampler, assembler
pub mod query;

/// HTTP surface: router, handlers and wire types
pub mod server;

// Re-export main types
pub use config::Config;
pub use engine::{MemoryReadingStore, MemoryRegistry, ReadingStore, Registry};
pub use error::{Error, Result};
pub use query::QueryEngine;
pub use types::{Metric, Reading, SensorAssignment, TimeWindow};
