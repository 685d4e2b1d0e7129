//! Configuration management for Canopy
//!
//! This module provides configuration file support with TOML format,
//! environment variable overrides, and sensible defaults. Every field has a
//! default, so an empty file (or no file at all) yields a working setup.
//!
//! ```toml
//! [server]
//! listen_addr = "0.0.0.0:8080"
//! log_level = "info"
//!
//! [query]
//! page_size = 1000
//!
//! [validation.temperature]
//! min = 2.0
//! max = 70.0
//!
//! [[registry.sensors]]
//! name = "vege-d4"
//! room = "vegetativo"
//! ```

use crate::error::{Error, Result, ValidationError};
use crate::query::validator::ValidRanges;
use crate::types::SensorAssignment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable pointing at the configuration file
pub const CONFIG_ENV_VAR: &str = "CANOPY_CONFIG";

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "canopy.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Query engine tuning
    #[serde(default)]
    pub query: QueryConfig,

    /// Plausible value ranges per metric
    #[serde(default)]
    pub validation: ValidRanges,

    /// Reading store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Static sensor → room registry
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (host:port)
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Log level (error, warn, info, debug, trace) or a full filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// CORS allowed origins (empty = allow any origin)
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

/// Query engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Rows per page when pagination is enabled
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Lookback used by list/latest queries without a start date
    #[serde(default = "default_window_hours")]
    pub default_window_hours: i64,

    /// Decimal places kept by the timeframed reducer
    #[serde(default = "default_aggregate_decimals")]
    pub aggregate_round_decimals: u32,

    /// Decimal places kept by the overview resampler
    #[serde(default = "default_overview_decimals")]
    pub overview_round_decimals: u32,
}

/// Reading store configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// JSON file with an array of readings loaded at startup
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

/// Registry configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Sensors and the room each one is installed in
    #[serde(default)]
    pub sensors: Vec<SensorAssignment>,
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_page_size() -> usize {
    1000
}
fn default_window_hours() -> i64 {
    24
}
fn default_aggregate_decimals() -> u32 {
    2
}
fn default_overview_decimals() -> u32 {
    1
}

/// Upper limit for `query.page_size`
const MAX_PAGE_SIZE: usize = 100_000;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            log_level: default_log_level(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_window_hours: default_window_hours(),
            aggregate_round_decimals: default_aggregate_decimals(),
            overview_round_decimals: default_overview_decimals(),
        }
    }
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load configuration using the standard lookup order
    ///
    /// Priority:
    /// 1. Explicit `path` argument
    /// 2. `CANOPY_CONFIG` environment variable
    /// 3. `./canopy.toml`
    /// 4. Defaults
    ///
    /// Environment overrides are applied on top, then the result is validated.
    /// Returns the configuration together with the file it came from, if any.
    pub fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let candidate = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
            .or_else(|| {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            });

        let (mut config, source) = match candidate {
            Some(file) => (Self::from_file(&file)?, Some(file)),
            None => (Self::default(), None),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok((config, source))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("CANOPY_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Ok(size) = std::env::var("CANOPY_PAGE_SIZE") {
            if let Ok(size) = size.parse() {
                self.query.page_size = size;
            }
        }
        if let Ok(seed) = std::env::var("CANOPY_SEED_FILE") {
            self.storage.seed_file = Some(PathBuf::from(seed));
        }
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.server.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.server.listen_addr.trim().is_empty() {
            return Err(ValidationError::InvalidFormat {
                field: "server.listen_addr".to_string(),
                message: "cannot be empty".to_string(),
            });
        }

        if self.query.page_size == 0 || self.query.page_size > MAX_PAGE_SIZE {
            return Err(ValidationError::OutOfRange {
                field: "query.page_size".to_string(),
                value: self.query.page_size.to_string(),
                min: "1".to_string(),
                max: MAX_PAGE_SIZE.to_string(),
            });
        }

        if self.query.default_window_hours <= 0 {
            return Err(ValidationError::OutOfRange {
                field: "query.default_window_hours".to_string(),
                value: self.query.default_window_hours.to_string(),
                min: "1".to_string(),
                max: i64::MAX.to_string(),
            });
        }

        for decimals in [
            ("query.aggregate_round_decimals", self.query.aggregate_round_decimals),
            ("query.overview_round_decimals", self.query.overview_round_decimals),
        ] {
            if decimals.1 > 10 {
                return Err(ValidationError::OutOfRange {
                    field: decimals.0.to_string(),
                    value: decimals.1.to_string(),
                    min: "0".to_string(),
                    max: "10".to_string(),
                });
            }
        }

        self.validation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.query.page_size, 1000);
        assert_eq!(config.query.default_window_hours, 24);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.query.page_size, 1000);
        assert_eq!(config.query.overview_round_decimals, 1);
        assert!(config.registry.sensors.is_empty());
    }

    #[test]
    fn test_parse_full_toml() {
        let config = Config::from_toml_str(
            r#"
            [server]
            listen_addr = "127.0.0.1:9000"

            [query]
            page_size = 50

            [validation.temperature]
            min = 0.0
            max = 50.0

            [[registry.sensors]]
            name = "vege-d4"
            room = "vegetativo"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.query.page_size, 50);
        assert!(!config.validation.is_valid(&Metric::Temperature, 55.0));
        assert!(config.validation.is_valid(&Metric::Humidity, 55.0));
        assert_eq!(config.registry.sensors[0].room, "vegetativo");
    }

    #[test]
    fn test_invalid_page_size() {
        let mut config = Config::default();
        config.query.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canopy.toml");
        std::fs::write(&path, "[query]\npage_size = 25\n").unwrap();

        let (config, source) = Config::load(Some(&path)).unwrap();
        assert_eq!(config.query.page_size, 25);
        assert_eq!(source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/canopy.toml")));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
