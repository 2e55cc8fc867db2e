//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CityBikes batch ETL
#[derive(Parser, Debug)]
#[command(name = "citybikes-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Country code to filter networks by (overrides config)
    #[arg(long, global = true)]
    pub country: Option<String>,

    /// Local directory for parquet files (overrides config)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, materialize and load one snapshot
    #[command(args_conflicts_with_subcommands = true)]
    Run {
        /// Named connector from the config file to load into (repeatable;
        /// defaults to the config's `destinations`)
        #[arg(long = "connector")]
        connectors: Vec<String>,

        /// Destination given directly on the command line
        #[command(subcommand)]
        target: Option<RunTarget>,
    },

    /// Print the filtered network catalog
    Networks {
        #[arg(short, long, default_value = "pretty")]
        format: OutputFormat,
    },

    /// Print one network's station snapshot
    Stations {
        /// Network identifier, e.g. citi-bike-nyc
        network_id: String,

        #[arg(short, long, default_value = "pretty")]
        format: OutputFormat,
    },

    /// Load every parquet object under a bucket prefix into the warehouse
    SyncWarehouse(WarehouseArgs),
}

/// Destinations selectable without a config file
#[derive(Subcommand, Debug)]
pub enum RunTarget {
    /// Local parquet files only
    Local,

    /// Upload to a bucket
    ObjectStore {
        /// Bucket URL: gs://, s3://, r2://, az:// or a local path
        #[arg(long)]
        url: String,
    },

    /// Upload to a bucket, then load into a DuckDB-backed warehouse
    Warehouse(WarehouseArgs),

    /// Load into PostgreSQL
    Postgres {
        #[arg(long)]
        user: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        host: String,

        #[arg(long)]
        port: u16,

        #[arg(long)]
        db: String,
    },
}

/// Warehouse location
#[derive(Args, Debug, Clone)]
pub struct WarehouseArgs {
    /// Bucket URL holding the parquet files
    #[arg(long)]
    pub bucket: String,

    /// Warehouse database (DuckDB file or md: path)
    #[arg(long)]
    pub database: String,

    /// Target schema
    #[arg(long, default_value = "citybikes")]
    pub schema: String,

    /// Key prefix of the parquet files in the bucket
    #[arg(long, default_value = "citybike_data")]
    pub prefix: String,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one row per line)
    Json,
    /// Human-readable table
    Pretty,
}
