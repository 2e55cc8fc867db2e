//! Object-store destination: verbatim upload of the local file

use super::{Destination, LoadReport};
use crate::error::Result;
use crate::output::{CloudStore, MaterializedDataset};
use async_trait::async_trait;
use tracing::info;

/// Uploads materialized files to a bucket, keyed by their relative path
#[derive(Debug, Clone)]
pub struct ObjectStoreDestination {
    name: String,
    store: CloudStore,
}

impl ObjectStoreDestination {
    /// Destination for a bucket URL (`gs://`, `s3://`, `r2://`, `az://`, or a local path)
    pub fn new(name: impl Into<String>, url: &str) -> Result<Self> {
        Ok(Self::with_store(name, CloudStore::parse(url)?))
    }

    pub fn with_store(name: impl Into<String>, store: CloudStore) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    pub fn store(&self) -> &CloudStore {
        &self.store
    }
}

#[async_trait]
impl Destination for ObjectStoreDestination {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, dataset: &MaterializedDataset) -> Result<LoadReport> {
        let uploaded = self
            .store
            .upload_file(&dataset.path, &dataset.relative_path)
            .await?;
        info!(
            "[{}] Uploaded {} to {} ({} bytes)",
            self.name,
            dataset.path.display(),
            uploaded.location,
            uploaded.size
        );

        Ok(LoadReport {
            destination: self.name.clone(),
            target: uploaded.location,
            rows: dataset.rows,
        })
    }
}
