//! Wire types for the CityBikes v2 API
//!
//! Only the fields the pipeline flattens are modelled; everything else in
//! the payload is ignored.

use serde::{Deserialize, Deserializer};

/// `GET /networks`
#[derive(Debug, Clone, Deserialize)]
pub struct NetworksResponse {
    pub networks: Vec<NetworkDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkDto {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub company: Option<Company>,
    pub location: LocationDto,
}

/// The `company` field is usually a list, occasionally a bare string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Company {
    Many(Vec<String>),
    One(String),
}

impl Company {
    /// The first listed operator, if any
    pub fn first(&self) -> Option<&str> {
        match self {
            Company::Many(names) => names.first().map(String::as_str),
            Company::One(name) => Some(name.as_str()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationDto {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// `GET /networks/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkDetailResponse {
    pub network: NetworkDetailDto,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkDetailDto {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub stations: Vec<StationDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationDto {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub free_bikes: Option<i64>,
    #[serde(default)]
    pub empty_slots: Option<i64>,
}

/// Identifiers are strings upstream, but a few feeds emit bare numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(i) => i.to_string(),
        Id::Float(f) => f.to_string(),
    })
}
