//! Local materialization of run tables as dated parquet files

use super::writer::{write_batch_to_parquet, ParquetWriterConfig};
use crate::error::{Error, Result};
use crate::types::RunDate;
use arrow::record_batch::RecordBatch;
use std::path::{Path, PathBuf};
use tracing::info;

/// A table written to local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedDataset {
    /// Semantic dataset name (`networks`, `bike_station_data`)
    pub dataset: String,
    /// Local path of the written file
    pub path: PathBuf,
    /// `<data_dir name>/<file>`, used as the remote key
    pub relative_path: String,
    pub rows: usize,
}

impl MaterializedDataset {
    /// File name without directory
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// Writes tables to `<data_dir>/<dataset>_<YYYYMMDD>.parquet`
#[derive(Debug, Clone)]
pub struct Materializer {
    data_dir: PathBuf,
    run_date: RunDate,
    writer_config: ParquetWriterConfig,
}

impl Materializer {
    pub fn new(data_dir: impl Into<PathBuf>, run_date: RunDate) -> Self {
        Self {
            data_dir: data_dir.into(),
            run_date,
            writer_config: ParquetWriterConfig::default(),
        }
    }

    #[must_use]
    pub fn with_writer_config(mut self, config: ParquetWriterConfig) -> Self {
        self.writer_config = config;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn run_date(&self) -> RunDate {
        self.run_date
    }

    /// Target path for `dataset` on this run date
    pub fn path_for(&self, dataset: &str) -> PathBuf {
        self.data_dir.join(self.run_date.file_name(dataset))
    }

    /// Write `table` as `dataset`, overwriting a file from an earlier run the same day
    pub fn materialize(&self, table: &RecordBatch, dataset: &str) -> Result<MaterializedDataset> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            Error::output(format!(
                "Failed to create data directory {}: {e}",
                self.data_dir.display()
            ))
        })?;

        let path = self.path_for(dataset);
        let rows = write_batch_to_parquet(&path, table, Some(&self.writer_config))?;

        let file_name = self.run_date.file_name(dataset);
        let relative_path = match self.data_dir.file_name().and_then(|n| n.to_str()) {
            Some(dir) => format!("{dir}/{file_name}"),
            None => file_name,
        };

        info!("Wrote {} rows to {}", rows, path.display());

        Ok(MaterializedDataset {
            dataset: dataset.to_string(),
            path,
            relative_path,
            rows,
        })
    }
}
