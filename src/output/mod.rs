//! Output module
//!
//! Turns fetched records into Arrow RecordBatches and writes them out.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - The fixed Arrow schemas of the `networks` and `bike_station_data` datasets
//! - Writing and reading Parquet files
//! - Materializing run tables as dated files under the data directory
//! - Bucket access (GCS, S3, R2, Azure, local)

mod cloud;
mod materialize;
mod schema;
mod writer;

pub use cloud::{CloudStore, ParquetObject, StoredObject};
pub use materialize::{MaterializedDataset, Materializer};
pub use schema::{
    concat_tables, network_schema, networks_to_batch, rows_per_network, station_schema,
    stations_to_batch, string_column,
};
pub use writer::{
    read_parquet, write_batch_to_parquet, ParquetCompression, ParquetWriter, ParquetWriterConfig,
};
