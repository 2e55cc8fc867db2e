//! Arrow schemas for the two datasets and record → RecordBatch conversion
//!
//! Column order is fixed so that every table produced in a run (and every
//! file produced across runs) has the same layout.

use crate::error::{Error, Result};
use crate::types::{Network, StationSnapshot};
use arrow::array::{
    Array, ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Schema of the `networks` dataset
pub fn network_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("network_id", DataType::Utf8, false),
        Field::new("network_name", DataType::Utf8, false),
        Field::new("company", DataType::Utf8, true),
        Field::new("city", DataType::Utf8, true),
        Field::new("country", DataType::Utf8, false),
        Field::new("latitude", DataType::Float64, true),
        Field::new("longitude", DataType::Float64, true),
    ]))
}

/// Schema of the `bike_station_data` dataset
pub fn station_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("network_id", DataType::Utf8, false),
        Field::new("station_id", DataType::Utf8, false),
        Field::new("station_name", DataType::Utf8, true),
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            true,
        ),
        Field::new("latitude", DataType::Float64, true),
        Field::new("longitude", DataType::Float64, true),
        Field::new("free_bikes", DataType::Int64, true),
        Field::new("empty_slots", DataType::Int64, true),
    ]))
}

/// Flatten network records into a RecordBatch
pub fn networks_to_batch(networks: &[Network]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            networks.iter().map(|n| n.network_id.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            networks.iter().map(|n| n.network_name.as_str()),
        )),
        Arc::new(StringArray::from_iter(
            networks.iter().map(|n| n.company.as_deref()),
        )),
        Arc::new(StringArray::from_iter(
            networks.iter().map(|n| n.city.as_deref()),
        )),
        Arc::new(StringArray::from_iter_values(
            networks.iter().map(|n| n.country.as_str()),
        )),
        Arc::new(Float64Array::from_iter(networks.iter().map(|n| n.latitude))),
        Arc::new(Float64Array::from_iter(networks.iter().map(|n| n.longitude))),
    ];

    RecordBatch::try_new(network_schema(), columns).map_err(|e| Error::Output {
        message: format!("Failed to create networks RecordBatch: {e}"),
    })
}

/// Flatten station snapshot records into a RecordBatch
pub fn stations_to_batch(stations: &[StationSnapshot]) -> Result<RecordBatch> {
    let timestamps = TimestampMicrosecondArray::from_iter(
        stations
            .iter()
            .map(|s| s.timestamp.map(|ts| ts.timestamp_micros())),
    )
    .with_timezone("UTC");

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            stations.iter().map(|s| s.network_id.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            stations.iter().map(|s| s.station_id.as_str()),
        )),
        Arc::new(StringArray::from_iter(
            stations.iter().map(|s| s.station_name.as_deref()),
        )),
        Arc::new(timestamps),
        Arc::new(Float64Array::from_iter(stations.iter().map(|s| s.latitude))),
        Arc::new(Float64Array::from_iter(stations.iter().map(|s| s.longitude))),
        Arc::new(Int64Array::from_iter(stations.iter().map(|s| s.free_bikes))),
        Arc::new(Int64Array::from_iter(stations.iter().map(|s| s.empty_slots))),
    ];

    RecordBatch::try_new(station_schema(), columns).map_err(|e| Error::Output {
        message: format!("Failed to create stations RecordBatch: {e}"),
    })
}

/// Concatenate tables sharing `schema` into one
///
/// An empty slice yields an empty table with that schema.
pub fn concat_tables(schema: &SchemaRef, tables: &[RecordBatch]) -> Result<RecordBatch> {
    if tables.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::clone(schema)));
    }
    Ok(concat_batches(schema, tables)?)
}

/// Row count per value of the `network_id` column
pub fn rows_per_network(batch: &RecordBatch) -> Result<BTreeMap<String, usize>> {
    let column = batch
        .column_by_name("network_id")
        .ok_or_else(|| Error::output("Table has no network_id column"))?;
    let ids = column
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::output("network_id column is not Utf8"))?;

    let mut counts = BTreeMap::new();
    for idx in 0..ids.len() {
        if ids.is_valid(idx) {
            *counts.entry(ids.value(idx).to_string()).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Values of a Utf8 column, in row order (nulls skipped)
pub fn string_column(batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| Error::output(format!("Table has no {name} column")))?;
    let values = column
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::output(format!("{name} column is not Utf8")))?;

    Ok(values.iter().flatten().map(str::to_string).collect())
}
