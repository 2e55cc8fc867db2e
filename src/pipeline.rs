//! Pipeline driver
//!
//! catalog → station fan-out → materialize → load. This is the only place
//! where the set of destinations is fixed for a run.

use crate::citybikes::CityBikesClient;
use crate::config::PipelineConfig;
use crate::destination::{Destination, LoadReport};
use crate::engine::{FailedNetwork, FanOut, FanOutConfig};
use crate::error::{Result, ResultExt};
use crate::http::HttpClient;
use crate::output::{rows_per_network, MaterializedDataset, Materializer};
use crate::types::{RunDate, NETWORKS_DATASET, STATIONS_DATASET};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_date: RunDate,
    /// Network ids of the catalog, in catalog order
    pub network_ids: Vec<String>,
    pub station_rows: usize,
    pub failed_networks: Vec<FailedNetwork>,
    pub datasets: Vec<MaterializedDataset>,
    pub loads: Vec<LoadReport>,
    pub duration: Duration,
}

impl RunReport {
    pub fn catalog_size(&self) -> usize {
        self.network_ids.len()
    }

    /// The materialized dataset with this name
    pub fn dataset(&self, name: &str) -> Option<&MaterializedDataset> {
        self.datasets.iter().find(|d| d.dataset == name)
    }
}

/// One configured ETL run
pub struct Pipeline {
    client: Arc<CityBikesClient>,
    country: String,
    fan_out: FanOutConfig,
    materializer: Materializer,
    destinations: Vec<Box<dyn Destination>>,
}

impl Pipeline {
    pub fn new(client: CityBikesClient, country: impl Into<String>, materializer: Materializer) -> Self {
        Self {
            client: Arc::new(client),
            country: country.into(),
            fan_out: FanOutConfig::default(),
            materializer,
            destinations: Vec::new(),
        }
    }

    /// Build a pipeline from config, dated today
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::from_config_at(config, RunDate::today())
    }

    /// Build a pipeline from config for a fixed run date
    pub fn from_config_at(config: &PipelineConfig, run_date: RunDate) -> Result<Self> {
        let http = HttpClient::with_config(config.http_client_config())?;
        let client = CityBikesClient::new(http, &config.api.base_url)?;
        let materializer = Materializer::new(&config.output.data_dir, run_date)
            .with_writer_config(config.writer_config());

        Ok(Self::new(client, &config.api.country, materializer)
            .with_fan_out(config.fan_out_config()))
    }

    #[must_use]
    pub fn with_fan_out(mut self, config: FanOutConfig) -> Self {
        self.fan_out = config;
        self
    }

    /// Add destinations; they load in the order given
    #[must_use]
    pub fn with_destinations(mut self, destinations: Vec<Box<dyn Destination>>) -> Self {
        self.destinations.extend(destinations);
        self
    }

    /// Run the whole pipeline once
    pub async fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        let run_date = self.materializer.run_date();
        info!("Starting run {} for country {}", run_date, self.country);

        let catalog = self.client.fetch_catalog(&self.country).await?;
        let network_ids = catalog.network_ids();

        let fan_out = FanOut::new(Arc::clone(&self.client)).with_config(self.fan_out.clone());
        let report = fan_out.run(&network_ids).await?;

        for (network_id, rows) in rows_per_network(&report.table)? {
            debug!("{network_id}: {rows} stations");
        }
        info!(
            "Fetched {} station rows from {} networks",
            report.total_rows(),
            report.succeeded.len()
        );

        let datasets = vec![
            self.materializer
                .materialize(catalog.table(), NETWORKS_DATASET)?,
            self.materializer
                .materialize(&report.table, STATIONS_DATASET)?,
        ];

        let mut loads = Vec::new();
        for destination in &self.destinations {
            for dataset in &datasets {
                let load = destination.load(dataset).await.with_context(|| {
                    format!(
                        "Destination '{}' failed to load {}",
                        destination.name(),
                        dataset.dataset
                    )
                })?;
                loads.push(load);
            }
        }

        let duration = start.elapsed();
        info!(
            "Run {} finished in {:?}: {} networks, {} station rows, {} loads",
            run_date,
            duration,
            network_ids.len(),
            report.total_rows(),
            loads.len()
        );

        Ok(RunReport {
            run_date,
            station_rows: report.total_rows(),
            failed_networks: report.failed,
            network_ids,
            datasets,
            loads,
            duration,
        })
    }
}
