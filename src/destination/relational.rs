//! Relational destination: replace the table schema, then append rows

use super::{run_blocking, Destination, LoadReport};
use crate::database::{DatabaseEngine, DatabaseTarget};
use crate::error::Result;
use crate::output::MaterializedDataset;
use async_trait::async_trait;
use tracing::info;

/// Loads datasets into tables named after them (`networks`, `bike_station_data`)
#[derive(Debug, Clone)]
pub struct RelationalDestination {
    name: String,
    target: DatabaseTarget,
}

impl RelationalDestination {
    pub fn new(name: impl Into<String>, target: DatabaseTarget) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }

    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }

    /// Rows currently in `table`
    pub async fn row_count(&self, table: &str) -> Result<usize> {
        let target = self.target.clone();
        let table = table.to_string();
        run_blocking(move || DatabaseEngine::attach(&target)?.row_count(&table)).await
    }

    /// Columns of `table`, in table order
    pub async fn columns(&self, table: &str) -> Result<Vec<String>> {
        let target = self.target.clone();
        let table = table.to_string();
        run_blocking(move || DatabaseEngine::attach(&target)?.columns(&table)).await
    }
}

#[async_trait]
impl Destination for RelationalDestination {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, dataset: &MaterializedDataset) -> Result<LoadReport> {
        let target = self.target.clone();
        let table = dataset.dataset.clone();
        let path = dataset.path.clone();

        let (rows, connection) = run_blocking(move || {
            let engine = DatabaseEngine::attach(&target)?;
            let rows = engine.replace_then_append(&table, &path)?;
            Ok((rows, engine.connection_info()))
        })
        .await?;

        info!(
            "[{}] Wrote {} rows to {} on {} ({})",
            self.name,
            rows,
            dataset.dataset,
            connection,
            self.target.kind()
        );

        Ok(LoadReport {
            destination: self.name.clone(),
            target: dataset.dataset.clone(),
            rows,
        })
    }
}
