//! CLI module
//!
//! Command-line interface for running the pipeline.
//!
//! # Commands
//!
//! - `run` - Fetch, materialize and load one snapshot
//! - `networks` - Print the filtered network catalog
//! - `stations` - Print one network's station snapshot
//! - `sync-warehouse` - Load a bucket prefix into the warehouse

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, RunTarget, WarehouseArgs};
pub use runner::Runner;

use tracing_subscriber::EnvFilter;

/// Log filter for the binary
///
/// `RUST_LOG` wins when it is set and parses; otherwise INFO, or DEBUG with
/// `--verbose`.
pub fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level.as_str()))
}
