//! Tolerant coordinate extraction from heterogeneous upstream records.
//!
//! The highway open-data feeds and the historical database rows disagree on
//! field names: some carry `lat`/`lng`, some a nested `coordinates` object,
//! some `latitude`/`longitude`, and the interchange feed uses `xValue`/`yValue`
//! (x is longitude). Normalizing here keeps the filter pipeline free of
//! field-name conditionals.

use serde_json::Value;
use shared::Coordinate;

/// National-territory bounding box. Values outside it are treated as missing
/// data, not merely out of range: the upstream feeds use junk like `(0, 0)`
/// for facilities without surveyed positions.
pub const DOMESTIC_LAT: std::ops::RangeInclusive<f64> = 33.0..=39.0;
pub const DOMESTIC_LNG: std::ops::RangeInclusive<f64> = 124.0..=132.0;

pub fn is_domestic(c: Coordinate) -> bool {
    DOMESTIC_LAT.contains(&c.lat) && DOMESTIC_LNG.contains(&c.lng)
}

/// Pull a coordinate pair out of a record, trying the known field spellings
/// in order. Returns `None` when nothing structurally valid is found; callers
/// must drop such records rather than defaulting to `(0, 0)`.
pub fn extract_coordinates(record: &Value) -> Option<Coordinate> {
    let attempts = [
        pair(record, "lat", "lng"),
        nested_pair(record, "coordinates"),
        pair(record, "latitude", "longitude"),
        // The interchange feed stores longitude in xValue and latitude in
        // yValue, as strings.
        pair_xy(record),
    ];

    attempts
        .into_iter()
        .flatten()
        .find(|c| c.is_wgs84())
}

fn pair(record: &Value, lat_key: &str, lng_key: &str) -> Option<Coordinate> {
    let lat = number(record.get(lat_key)?)?;
    let lng = number(record.get(lng_key)?)?;
    Some(Coordinate { lat, lng })
}

fn nested_pair(record: &Value, key: &str) -> Option<Coordinate> {
    let nested = record.get(key)?;
    pair(nested, "lat", "lng")
}

fn pair_xy(record: &Value) -> Option<Coordinate> {
    let lng = record
        .get("xValue")
        .or_else(|| record.get("x"))
        .and_then(number)?;
    let lat = record
        .get("yValue")
        .or_else(|| record.get("y"))
        .and_then(number)?;
    Some(Coordinate { lat, lng })
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
