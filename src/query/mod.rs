//! Query engine for sensor readings
//!
//! Every request runs the same read-only pipeline:
//!
//! ```text
//! raw params ─► QueryRequest ─► filter ─► reducer ─► assembler ─► JSON
//!                                  │          │
//!                          range validator   room map
//! ```
//!
//! - [`params`]: lenient parsing of query-string parameters
//! - [`validator`]: per-metric plausibility ranges
//! - [`filter`]: window, sensor and validity predicates
//! - [`enrichment`]: per-request sensor → room lookup
//! - [`reducers`]: list, latest and timeframed reducers
//! - [`resample`]: gap-filling for the overview charts
//! - [`response`]: pagination and metadata envelope
//! - [`engine`]: the pipeline wired to storage collaborators
//!
//! # Example
//!
//! ```rust,no_run
//! use canopy::engine::{MemoryReadingStore, MemoryRegistry};
//! use canopy::query::{QueryEngine, QueryRequest, RawQueryParams};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = QueryEngine::new(
//!     Arc::new(MemoryReadingStore::new()),
//!     Arc::new(MemoryRegistry::new()),
//! );
//!
//! let raw = RawQueryParams {
//!     timeframe: Some("30T".into()),
//!     aggregations: Some("true".into()),
//!     ..Default::default()
//! };
//! let request = QueryRequest::from_raw(&raw)?;
//! let response = engine.timeframed(&request).await?;
//! println!("{}", serde_json::to_string(&response)?);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod enrichment;
pub mod error;
pub mod filter;
pub mod numeric;
pub mod params;
pub mod reducers;
pub mod resample;
pub mod response;
pub mod timeframe;
pub mod validator;

// Re-export main types
pub use engine::{EngineSettings, QueryEngine};
pub use enrichment::RoomMap;
pub use error::{QueryError, QueryErrorKind};
pub use filter::{FilterParams, QueryFilter};
pub use params::{DateBound, QueryRequest, RawQueryParams};
pub use reducers::{BucketRow, BucketValue, ReadingRow, TimeframedReducer};
pub use resample::{OverviewSeries, Resampler, SeriesPoint};
pub use response::{QueryMetadata, QueryResponse, ResponseOptions};
pub use timeframe::Timeframe;
pub use validator::{MetricRange, ValidRanges, Validity};
