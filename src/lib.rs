// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # CityBikes ETL
//!
//! A batch pipeline that snapshots the public CityBikes network API into
//! parquet files and loads them into a bucket, a warehouse, or a
//! relational database.
//!
//! ## Features
//!
//! - **Catalog fetch**: `GET /networks`, filtered to one country
//! - **Station fan-out**: one `GET /networks/{id}` per network, sequential or
//!   through a bounded worker pool with per-task timeouts
//! - **Explicit failure policy**: skip failed networks or abort the run
//! - **Parquet materialization**: `<data_dir>/<dataset>_<YYYYMMDD>.parquet`
//! - **Destinations**: GCS/S3/R2/Azure buckets, a DuckDB-backed warehouse,
//!   PostgreSQL or DuckDB files
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use citybikes_etl::{config::PipelineConfig, pipeline::Pipeline, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = PipelineConfig::load("pipeline.yaml")?;
//!     let report = Pipeline::from_config(&config)?.run().await?;
//!     println!("{} station rows", report.station_rows);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ids   ┌──────────────┐  table  ┌──────────────┐
//! │   Catalog    │ ──────► │   Fan-out    │ ──────► │ Materializer │
//! │  (networks)  │         │  (stations)  │         │  (parquet)   │
//! └──────────────┘         └──────────────┘         └──────┬───────┘
//!                                                          │
//!                         ┌────────────────┬───────────────┴┐
//!                         │  Object store  │   Warehouse    │  Relational
//!                         └────────────────┴────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pipeline
pub mod error;

/// Record types, run date and shared constants
pub mod types;

/// HTTP client with optional retry and rate limiting
pub mod http;

/// CityBikes API fetchers
pub mod citybikes;

/// Arrow/Parquet output
pub mod output;

/// Station fan-out engine
pub mod engine;

/// DuckDB load engine
pub mod database;

/// Destination loaders
pub mod destination;

/// Pipeline configuration
pub mod config;

/// Pipeline driver
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::PipelineConfig;
pub use pipeline::{Pipeline, RunReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
