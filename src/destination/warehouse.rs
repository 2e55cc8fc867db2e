//! Warehouse destination: bucket prefix → DuckDB-backed warehouse tables

use super::{run_blocking, Destination, LoadReport};
use crate::database::DatabaseEngine;
use crate::error::Result;
use crate::output::{CloudStore, MaterializedDataset, ParquetObject};
use async_trait::async_trait;
use std::io::Write;
use tracing::{debug, info};

/// Stages parquet objects from a bucket and loads each into a table named by its stem
///
/// Loads always replace the table; nothing is incremental.
#[derive(Debug, Clone)]
pub struct WarehouseDestination {
    name: String,
    store: CloudStore,
    database: String,
    schema: String,
    prefix: String,
}

impl WarehouseDestination {
    pub fn new(
        name: impl Into<String>,
        bucket: &str,
        database: String,
        schema: String,
        prefix: String,
    ) -> Result<Self> {
        Ok(Self::with_store(
            name,
            CloudStore::parse(bucket)?,
            database,
            schema,
            prefix,
        ))
    }

    pub fn with_store(
        name: impl Into<String>,
        store: CloudStore,
        database: String,
        schema: String,
        prefix: String,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            database,
            schema,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    /// Target schema of the loaded tables
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Load every `.parquet` object under the prefix
    pub async fn sync(&self) -> Result<Vec<LoadReport>> {
        let objects = self.store.list_parquet(&self.prefix).await?;
        info!(
            "[{}] Found {} parquet objects under {}",
            self.name,
            objects.len(),
            self.store.display_key(&self.prefix)
        );

        let mut reports = Vec::with_capacity(objects.len());
        for object in &objects {
            reports.push(self.load_object(object).await?);
        }
        Ok(reports)
    }

    /// Download one object to a staging file and bulk-load it
    async fn load_object(&self, object: &ParquetObject) -> Result<LoadReport> {
        let bytes = self.store.get(&object.key).await?;
        debug!("[{}] Staging {} ({} bytes)", self.name, object.key, bytes.len());

        let database = self.database.clone();
        let schema = self.schema.clone();
        let table = object.stem.clone();
        let rows = run_blocking(move || {
            let mut staged = tempfile::Builder::new()
                .prefix("citybikes-")
                .suffix(".parquet")
                .tempfile()?;
            staged.write_all(&bytes)?;
            staged.flush()?;

            let engine = DatabaseEngine::open_warehouse(&database)?;
            engine.create_or_replace(&schema, &table, staged.path())
        })
        .await?;

        let target = format!("{}.{}", self.schema, object.stem);
        info!("[{}] Loaded {} rows into {}", self.name, rows, target);

        Ok(LoadReport {
            destination: self.name.clone(),
            target,
            rows,
        })
    }
}

#[async_trait]
impl Destination for WarehouseDestination {
    fn name(&self) -> &str {
        &self.name
    }

    /// Upload the dataset under the prefix, then load that object
    async fn load(&self, dataset: &MaterializedDataset) -> Result<LoadReport> {
        let key = if self.prefix.is_empty() {
            dataset.file_name().to_string()
        } else {
            format!("{}/{}", self.prefix, dataset.file_name())
        };
        let uploaded = self.store.upload_file(&dataset.path, &key).await?;
        debug!("[{}] Uploaded {}", self.name, uploaded.location);

        let stem = dataset
            .file_name()
            .strip_suffix(".parquet")
            .unwrap_or(dataset.file_name())
            .to_string();
        let object = ParquetObject {
            key: uploaded.key,
            stem,
            size: uploaded.size,
        };
        self.load_object(&object).await
    }
}
