//! Network catalog and station snapshot fetchers

use super::model::{NetworkDetailResponse, NetworkDto, NetworksResponse, StationDto};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::output::{networks_to_batch, stations_to_batch};
use crate::types::{Network, StationSnapshot};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, info, warn};
use url::Url;

/// The filtered network catalog of one run
#[derive(Debug, Clone)]
pub struct Catalog {
    networks: Vec<Network>,
    table: RecordBatch,
}

impl Catalog {
    /// Build a catalog from already-filtered networks
    pub fn new(networks: Vec<Network>) -> Result<Self> {
        let table = networks_to_batch(&networks)?;
        Ok(Self { networks, table })
    }

    /// Network identifiers, in catalog order
    pub fn network_ids(&self) -> Vec<String> {
        self.networks.iter().map(|n| n.network_id.clone()).collect()
    }

    /// The flattened records
    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    /// The catalog as a table
    pub fn table(&self) -> &RecordBatch {
        &self.table
    }

    /// Number of networks in the catalog
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Whether no network matched the country filter
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

/// Client for the CityBikes v2 API
#[derive(Debug, Clone)]
pub struct CityBikesClient {
    http: HttpClient,
    base_url: Url,
}

impl CityBikesClient {
    /// Create a client rooted at `base_url` (e.g. `http://api.citybik.es/v2`)
    pub fn new(http: HttpClient, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::invalid_value(
                "api.base_url",
                format!("{base_url} cannot be used as a base URL"),
            ));
        }
        Ok(Self { http, base_url })
    }

    /// The API root
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/networks`
    pub fn networks_url(&self) -> Url {
        self.endpoint(&["networks"])
    }

    /// `{base}/networks/{id}`
    pub fn network_url(&self, network_id: &str) -> Url {
        self.endpoint(&["networks", network_id])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Fetch the network listing and keep the networks located in `country`
    ///
    /// Upstream order is preserved. Failures are logged here and returned.
    pub async fn fetch_catalog(&self, country: &str) -> Result<Catalog> {
        let url = self.networks_url();
        info!("Getting the list of networks from {url}");

        let response: NetworksResponse = self
            .http
            .get_json(url.as_str())
            .await
            .inspect_err(|e| log_fetch_failure("network catalog", e))?;

        let total = response.networks.len();
        let networks = filter_networks(response.networks, country);
        info!(
            "Catalog: {} of {} networks located in {}",
            networks.len(),
            total,
            country
        );

        Catalog::new(networks)
    }

    /// Fetch one network's stations as flattened records
    pub async fn fetch_station_records(&self, network_id: &str) -> Result<Vec<StationSnapshot>> {
        let url = self.network_url(network_id);
        debug!("Processing network_id: {network_id}");

        let response: NetworkDetailResponse = self
            .http
            .get_json(url.as_str())
            .await
            .inspect_err(|e| log_fetch_failure(network_id, e))?;

        if response.network.id != network_id {
            warn!(
                "Payload for {} reports network id {}; keeping the requested id",
                network_id, response.network.id
            );
        }

        Ok(flatten_stations(network_id, response.network.stations))
    }

    /// Fetch one network's station snapshot as a table
    pub async fn fetch_stations(&self, network_id: &str) -> Result<RecordBatch> {
        let records = self.fetch_station_records(network_id).await?;
        stations_to_batch(&records)
    }
}

/// Keep the networks whose country code equals `country`, flattened
pub fn filter_networks(networks: Vec<NetworkDto>, country: &str) -> Vec<Network> {
    networks
        .into_iter()
        .filter_map(|dto| {
            let located_in = dto.location.country.as_deref() == Some(country);
            located_in.then(|| Network {
                company: dto.company.as_ref().and_then(|c| c.first()).map(String::from),
                network_id: dto.id,
                network_name: dto.name,
                city: dto.location.city,
                country: country.to_string(),
                latitude: dto.location.latitude,
                longitude: dto.location.longitude,
            })
        })
        .collect()
}

/// Flatten a station list; every row carries `network_id`
pub fn flatten_stations(network_id: &str, stations: Vec<StationDto>) -> Vec<StationSnapshot> {
    stations
        .into_iter()
        .map(|s| StationSnapshot {
            network_id: network_id.to_string(),
            station_id: s.id,
            station_name: s.name,
            timestamp: s.timestamp.as_deref().and_then(parse_timestamp),
            latitude: s.latitude,
            longitude: s.longitude,
            free_bikes: s.free_bikes,
            empty_slots: s.empty_slots,
        })
        .collect()
}

/// RFC 3339, or a naive ISO timestamp taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn log_fetch_failure(what: &str, error: &Error) {
    match error {
        Error::HttpStatus { status, body } => {
            warn!("Failed to retrieve {what}: status code {status}");
            warn!("Response content: {body}");
        }
        Error::Decode { message, body } => {
            warn!("Failed to retrieve {what}: response content is not valid JSON ({message})");
            warn!("Response content: {body}");
        }
        other => warn!("Failed to retrieve {what}: {other}"),
    }
}
