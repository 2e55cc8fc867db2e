//! CityBikes API module
//!
//! Fetches the network catalog (`GET {base}/networks`) and per-network
//! station snapshots (`GET {base}/networks/{id}`), flattening both into
//! Arrow tables.

mod client;
mod model;

pub use client::{
    filter_networks, flatten_stations, parse_timestamp, Catalog, CityBikesClient,
};
pub use model::{
    Company, LocationDto, NetworkDetailDto, NetworkDetailResponse, NetworkDto, NetworksResponse,
    StationDto,
};
