//! Pipeline configuration
//!
//! Loaded from a YAML file; every field has a default so an empty file
//! (or no file at all) yields a runnable local-only pipeline.

use crate::database::PostgresConnection;
use crate::engine::{FailurePolicy, FanOutConfig, FetchMode, ResultOrder};
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::output::{ParquetCompression, ParquetWriterConfig};
use crate::types::{DEFAULT_BASE_URL, DEFAULT_COUNTRY, DEFAULT_DATA_DIR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pipeline configuration loaded from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub fan_out: FanOutSettings,

    #[serde(default)]
    pub output: OutputConfig,

    /// Connector names to load into, in order
    #[serde(default)]
    pub destinations: Vec<String>,

    /// Named destination definitions
    #[serde(default)]
    pub connectors: BTreeMap<String, ConnectorConfig>,
}

impl PipelineConfig {
    /// Load and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound {
                path: path.display().to_string(),
            },
            _ => Error::Io(e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.api.base_url)
            .map_err(|e| Error::invalid_value("api.base_url", e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(Error::invalid_value(
                "api.base_url",
                format!("{base} cannot be used as a base URL"),
            ));
        }

        if self.api.country.trim().is_empty() {
            return Err(Error::invalid_value("api.country", "must not be empty"));
        }

        if self.http.timeout_secs == 0 {
            return Err(Error::invalid_value("http.timeout_secs", "must be at least 1"));
        }

        if self.fan_out.capacity == 0 {
            return Err(Error::invalid_value("fan_out.capacity", "must be at least 1"));
        }

        if self.fan_out.task_timeout_secs == 0 {
            return Err(Error::invalid_value(
                "fan_out.task_timeout_secs",
                "must be at least 1",
            ));
        }

        for name in &self.destinations {
            if !self.connectors.contains_key(name) {
                return Err(Error::invalid_value(
                    "destinations",
                    format!("unknown connector '{name}'"),
                ));
            }
        }

        Ok(())
    }

    /// Look up a named connector
    pub fn connector(&self, name: &str) -> Result<&ConnectorConfig> {
        self.connectors
            .get(name)
            .ok_or_else(|| Error::config(format!("Unknown connector '{name}'")))
    }

    /// HTTP client settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.http.timeout_secs))
            .max_retries(self.http.max_retries);
        if let Some(rate_limit) = &self.http.rate_limit {
            builder = builder.rate_limit(rate_limit.clone());
        }
        builder.build()
    }

    /// Fan-out settings
    pub fn fan_out_config(&self) -> FanOutConfig {
        let config = FanOutConfig::new()
            .with_task_timeout(Duration::from_secs(self.fan_out.task_timeout_secs))
            .with_failure_policy(self.fan_out.failure_policy)
            .with_order(self.fan_out.order);
        match self.fan_out.mode {
            FetchMode::Sequential => config.sequential(),
            FetchMode::Parallel => config.parallel(self.fan_out.capacity),
        }
    }

    /// Parquet writer settings
    pub fn writer_config(&self) -> ParquetWriterConfig {
        ParquetWriterConfig::new().with_compression(self.output.compression)
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Upstream API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Country code networks are filtered to
    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            country: default_country(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries for transient failures (0 = no retries)
    #[serde(default)]
    pub max_retries: u32,

    /// Token bucket shared by all fetches
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: 0,
            rate_limit: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Fan-out settings as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutSettings {
    #[serde(default)]
    pub mode: FetchMode,

    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    #[serde(default)]
    pub order: ResultOrder,
}

impl Default for FanOutSettings {
    fn default() -> Self {
        Self {
            mode: FetchMode::default(),
            capacity: default_capacity(),
            task_timeout_secs: default_task_timeout(),
            failure_policy: FailurePolicy::default(),
            order: ResultOrder::default(),
        }
    }
}

fn default_capacity() -> usize {
    100
}

fn default_task_timeout() -> u64 {
    60
}

/// Local output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub compression: ParquetCompression,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            compression: ParquetCompression::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

// ============================================================================
// Connectors
// ============================================================================

/// A named destination definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectorConfig {
    /// Bucket upload
    ObjectStore { url: String },

    /// Bucket prefix bulk-loaded into a DuckDB-backed warehouse
    Warehouse {
        bucket: String,
        database: String,
        #[serde(default = "default_warehouse_schema")]
        schema: String,
        #[serde(default = "default_prefix")]
        prefix: String,
    },

    /// PostgreSQL database
    Postgres(PostgresConnection),

    /// DuckDB database file
    Duckdb { path: String },
}

fn default_warehouse_schema() -> String {
    "citybikes".to_string()
}

fn default_prefix() -> String {
    DEFAULT_DATA_DIR.to_string()
}

impl ConnectorConfig {
    /// Warehouse connector with default schema and prefix
    pub fn warehouse(bucket: impl Into<String>, database: impl Into<String>) -> Self {
        Self::Warehouse {
            bucket: bucket.into(),
            database: database.into(),
            schema: default_warehouse_schema(),
            prefix: default_prefix(),
        }
    }
}
