//! Ingestion of open-data records into the reference tables.
//!
//! A sync run is a full refresh: fetch every page, rebuild the derived
//! fields (normalized route names, interchange weights, adjacency), swap
//! the table contents, and leave a row in sync_logs either way.

use std::collections::BTreeMap;

use serde_json::Value;

use shared::Direction;

use crate::database::{Database, DatabaseError};
use crate::extract::{extract_coordinates, is_domestic};
use crate::models::{string_field, Interchange, RestAreaCandidate};
use crate::providers::{HighwayDataClient, ProviderError};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Feed route names come as "경부고속도로"; interchange and rest area
/// records must agree on one spelling for the per-route grouping to work.
pub fn normalize_route_name(raw: &str) -> String {
    raw.replace("고속도로", "선")
        .replace("고속국도", "선")
        .replace("자동차도", "선")
        .trim()
        .to_string()
}

/// Convert raw rest area records, dropping unusable ones.
pub fn build_rest_areas(records: &[Value]) -> Vec<RestAreaCandidate> {
    let mut areas: Vec<RestAreaCandidate> = records
        .iter()
        .filter_map(RestAreaCandidate::from_record)
        .map(|mut area| {
            area.route_name = normalize_route_name(&area.route_name);
            area
        })
        .collect();
    areas.sort_by(|a, b| a.id.cmp(&b.id));
    areas.dedup_by(|a, b| a.id == b.id);
    areas
}

/// Convert raw interchange records into weighted rows.
///
/// Per route, records are ordered by their distance from the route origin
/// and each physical interchange becomes one row per carriageway: DOWN
/// weights count up along that ordering, UP weights count down, so on
/// either carriageway the weight grows in travel direction.
pub fn build_interchanges(records: &[Value]) -> Vec<Interchange> {
    struct RawIc {
        code: String,
        name: String,
        route_name: String,
        route_no: Option<String>,
        start_km: f64,
        coordinates: shared::Coordinate,
    }

    // BTreeMap keeps route iteration order stable across runs.
    let mut by_route: BTreeMap<String, Vec<RawIc>> = BTreeMap::new();
    for record in records {
        let Some(name) = string_field(record, &["unitName", "name"]) else {
            continue;
        };
        let Some(coordinates) = extract_coordinates(record).filter(|c| is_domestic(*c)) else {
            tracing::warn!(ic = %name, "interchange without usable coordinates skipped");
            continue;
        };
        let code = string_field(record, &["unitCode", "id"]).unwrap_or_else(|| name.clone());
        let route_no = string_field(record, &["routeCode", "routeNo"]);
        let route_name = normalize_route_name(
            &string_field(record, &["routeName", "route_name"]).unwrap_or_default(),
        );
        let start_km = string_field(record, &["startValue"])
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        by_route
            .entry(route_no.clone().unwrap_or_else(|| route_name.clone()))
            .or_default()
            .push(RawIc {
                code,
                name,
                route_name,
                route_no,
                start_km,
                coordinates,
            });
    }

    let mut interchanges: Vec<Interchange> = Vec::new();
    for ics in by_route.into_values() {
        let mut ics = ics;
        ics.sort_by(|a, b| {
            a.start_km
                .total_cmp(&b.start_km)
                .then_with(|| a.code.cmp(&b.code))
        });

        let count = ics.len();
        for (index, ic) in ics.iter().enumerate() {
            let prev_id = (index > 0).then(|| ics[index - 1].code.clone());
            let next_id = (index + 1 < count).then(|| ics[index + 1].code.clone());

            for direction in [Direction::Up, Direction::Down] {
                let weight = match direction {
                    Direction::Down => index as i32 + 1,
                    _ => (count - index) as i32,
                };
                interchanges.push(Interchange {
                    id: format!("{}_{}", ic.code, crate::database::direction_to_str(direction)),
                    name: ic.name.clone(),
                    route_name: ic.route_name.clone(),
                    route_no: ic.route_no.clone(),
                    direction,
                    weight,
                    coordinates: ic.coordinates,
                    prev_id: prev_id.clone(),
                    next_id: next_id.clone(),
                });
            }
        }
    }

    interchanges
}

pub async fn sync_rest_areas(
    client: &HighwayDataClient,
    db: &Database,
) -> Result<u64, SyncError> {
    match fetch_and_store_rest_areas(client, db).await {
        Ok(count) => {
            db.record_sync("REST_AREA", "SUCCESS", count as i32, None).await?;
            Ok(count)
        }
        Err(e) => {
            let message = e.to_string();
            if let Err(log_err) = db.record_sync("REST_AREA", "FAILED", 0, Some(&message)).await {
                tracing::error!(error = %log_err, "failed to record sync failure");
            }
            Err(e)
        }
    }
}

async fn fetch_and_store_rest_areas(
    client: &HighwayDataClient,
    db: &Database,
) -> Result<u64, SyncError> {
    let records = client.fetch_rest_areas().await?;
    let areas = build_rest_areas(&records);
    tracing::info!(raw = records.len(), usable = areas.len(), "rest area records converted");
    Ok(db.replace_rest_areas(&areas).await?)
}

pub async fn sync_interchanges(
    client: &HighwayDataClient,
    db: &Database,
) -> Result<u64, SyncError> {
    match fetch_and_store_interchanges(client, db).await {
        Ok(count) => {
            db.record_sync("INTERCHANGE", "SUCCESS", count as i32, None).await?;
            Ok(count)
        }
        Err(e) => {
            let message = e.to_string();
            if let Err(log_err) = db.record_sync("INTERCHANGE", "FAILED", 0, Some(&message)).await
            {
                tracing::error!(error = %log_err, "failed to record sync failure");
            }
            Err(e)
        }
    }
}

async fn fetch_and_store_interchanges(
    client: &HighwayDataClient,
    db: &Database,
) -> Result<u64, SyncError> {
    let records = client.fetch_interchanges().await?;
    let interchanges = build_interchanges(&records);
    tracing::info!(
        raw = records.len(),
        rows = interchanges.len(),
        "interchange records converted"
    );
    Ok(db.replace_interchanges(&interchanges).await?)
}
