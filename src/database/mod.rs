//! Relational and warehouse loading via DuckDB
//!
//! DuckDB reads the materialized parquet files and writes them into an
//! attached PostgreSQL database, a DuckDB file, or a DuckDB-backed warehouse.

mod engine;

pub use engine::{mask_password, DatabaseEngine, DatabaseTarget, PostgresConnection};
