//! CLI runner - executes commands

use crate::citybikes::CityBikesClient;
use crate::cli::commands::{Cli, Commands, OutputFormat, RunTarget, WarehouseArgs};
use crate::config::PipelineConfig;
use crate::database::{DatabaseTarget, PostgresConnection};
use crate::destination::{
    build_destination, Destination, ObjectStoreDestination, RelationalDestination,
    WarehouseDestination,
};
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpClient;
use crate::pipeline::{Pipeline, RunReport};
use arrow::record_batch::RecordBatch;
use serde_json::json;
use std::io::Write;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::Run { connectors, target } => {
                let destinations: Vec<Box<dyn Destination>> = match target {
                    Some(target) => self.target_destination(target)?.into_iter().collect(),
                    None => self.named_destinations(&config, connectors)?,
                };
                let report = Pipeline::from_config(&config)?
                    .with_destinations(destinations)
                    .run()
                    .await?;
                print_run_report(&report)
            }
            Commands::Networks { format } => {
                let catalog = self.client(&config)?.fetch_catalog(&config.api.country).await?;
                print_table(catalog.table(), *format)
            }
            Commands::Stations { network_id, format } => {
                let table = self.client(&config)?.fetch_stations(network_id).await?;
                print_table(&table, *format)
            }
            Commands::SyncWarehouse(args) => {
                let warehouse = warehouse_destination("warehouse", args)?;
                let reports = warehouse.sync().await?;
                info!("Loaded {} tables into {}", reports.len(), args.database);
                print_json(&json!({ "loads": reports }))
            }
        }
    }

    /// Config file (or defaults) with command-line overrides applied
    fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.cli.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(country) = &self.cli.country {
            config.api.country.clone_from(country);
        }
        if let Some(data_dir) = &self.cli.data_dir {
            config.output.data_dir.clone_from(data_dir);
        }

        config.validate()?;
        Ok(config)
    }

    fn client(&self, config: &PipelineConfig) -> Result<CityBikesClient> {
        let http = HttpClient::with_config(config.http_client_config())?;
        CityBikesClient::new(http, &config.api.base_url)
    }

    /// Destinations named on the command line, or the config's list
    fn named_destinations(
        &self,
        config: &PipelineConfig,
        connectors: &[String],
    ) -> Result<Vec<Box<dyn Destination>>> {
        let names = if connectors.is_empty() {
            &config.destinations
        } else {
            connectors
        };

        names
            .iter()
            .map(|name| build_destination(name, config.connector(name)?))
            .collect()
    }

    /// Destination spelled out by a `run` subcommand; `None` for local-only runs
    fn target_destination(&self, target: &RunTarget) -> Result<Option<Box<dyn Destination>>> {
        let destination: Box<dyn Destination> = match target {
            RunTarget::Local => return Ok(None),
            RunTarget::ObjectStore { url } => {
                Box::new(ObjectStoreDestination::new("object-store", url)?)
            }
            RunTarget::Warehouse(args) => Box::new(warehouse_destination("warehouse", args)?),
            RunTarget::Postgres {
                user,
                password,
                host,
                port,
                db,
            } => {
                let connection = PostgresConnection {
                    host: host.clone(),
                    port: *port,
                    user: user.clone(),
                    password: password.clone(),
                    database: db.clone(),
                };
                Box::new(RelationalDestination::new(
                    "postgres",
                    DatabaseTarget::Postgres(connection),
                ))
            }
        };
        Ok(Some(destination))
    }
}

fn warehouse_destination(name: &str, args: &WarehouseArgs) -> Result<WarehouseDestination> {
    WarehouseDestination::new(
        name,
        &args.bucket,
        args.database.clone(),
        args.schema.clone(),
        args.prefix.clone(),
    )
}

fn print_run_report(report: &RunReport) -> Result<()> {
    let datasets: Vec<_> = report
        .datasets
        .iter()
        .map(|d| json!({ "dataset": d.dataset, "path": d.path, "rows": d.rows }))
        .collect();

    print_json(&json!({
        "run_date": report.run_date.to_string(),
        "networks": report.catalog_size(),
        "station_rows": report.station_rows,
        "failed_networks": report.failed_networks,
        "datasets": datasets,
        "loads": report.loads,
        "duration_ms": u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
    }))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Write a table to stdout
fn print_table(table: &RecordBatch, format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            let mut writer = arrow::json::LineDelimitedWriter::new(&mut out);
            writer.write(table)?;
            writer.finish()?;
        }
        OutputFormat::Pretty => {
            let rendered = arrow::util::pretty::pretty_format_batches(std::slice::from_ref(table))?;
            writeln!(out, "{rendered}")?;
        }
    }

    out.flush().map_err(Error::from)
}
