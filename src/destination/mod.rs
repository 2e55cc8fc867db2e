//! Destination loaders
//!
//! Every destination takes a dataset already materialized on local disk
//! and loads it somewhere else: a bucket, a warehouse, or a relational
//! database. Destinations are built from named connector definitions.

mod bucket;
mod relational;
mod warehouse;

pub use bucket::ObjectStoreDestination;
pub use relational::RelationalDestination;
pub use warehouse::WarehouseDestination;

use crate::config::ConnectorConfig;
use crate::database::DatabaseTarget;
use crate::error::{Error, Result};
use crate::output::MaterializedDataset;
use async_trait::async_trait;
use serde::Serialize;

/// Outcome of loading one dataset into one destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Connector name
    pub destination: String,
    /// Where the rows ended up (object URL, table name)
    pub target: String,
    pub rows: usize,
}

/// A sink for materialized datasets
#[async_trait]
pub trait Destination: Send + Sync {
    /// Connector name, for logs and reports
    fn name(&self) -> &str;

    /// Load one dataset
    async fn load(&self, dataset: &MaterializedDataset) -> Result<LoadReport>;
}

/// Build the destination described by a named connector
pub fn build_destination(name: &str, connector: &ConnectorConfig) -> Result<Box<dyn Destination>> {
    let destination: Box<dyn Destination> = match connector {
        ConnectorConfig::ObjectStore { url } => Box::new(ObjectStoreDestination::new(name, url)?),
        ConnectorConfig::Warehouse {
            bucket,
            database,
            schema,
            prefix,
        } => Box::new(WarehouseDestination::new(
            name,
            bucket,
            database.clone(),
            schema.clone(),
            prefix.clone(),
        )?),
        ConnectorConfig::Postgres(pg) => Box::new(RelationalDestination::new(
            name,
            DatabaseTarget::Postgres(pg.clone()),
        )),
        ConnectorConfig::Duckdb { path } => Box::new(RelationalDestination::new(
            name,
            DatabaseTarget::Duckdb { path: path.clone() },
        )),
    };
    Ok(destination)
}

/// Run blocking DuckDB work off the async runtime
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Worker {
            message: format!("Blocking load task failed: {e}"),
        })?
}
