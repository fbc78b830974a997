use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{Coordinate, Direction};

use crate::extract::{extract_coordinates, is_domestic};

/// Read-only snapshot of a rest area as pulled from the datastore or the
/// open-data API. The filter pipeline never mutates these; it only selects
/// and annotates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestAreaCandidate {
    pub id: String,
    pub name: String,
    pub route_name: String,
    pub route_code: Option<String>,
    /// Raw carriageway direction string as delivered upstream ("부산방향",
    /// "상행", free text). Normalized lazily by the direction filter.
    pub direction_raw: Option<String>,
    /// Already-normalized direction when the datastore has one.
    pub route_direction: Option<Direction>,
    pub coordinates: Option<Coordinate>,
    pub facilities: Vec<String>,
}

impl RestAreaCandidate {
    /// Build a candidate from a raw upstream record, normalizing the
    /// coordinate shape at the boundary. Records without a usable position
    /// still become candidates; the proximity filter drops them.
    pub fn from_record(record: &Value) -> Option<Self> {
        let name = string_field(record, &["unitName", "name", "restAreaName"])?;
        let id = string_field(record, &["unitCode", "id", "restAreaCode"])
            .unwrap_or_else(|| name.clone());
        let route_name = string_field(record, &["routeName", "route_name"]).unwrap_or_default();
        let route_code = string_field(record, &["routeCode", "route_no", "routeNo"]);
        let direction_raw = string_field(record, &["direction", "gudClssNm", "updownCode"]);

        let coordinates = extract_coordinates(record).filter(|c| is_domestic(*c));

        Some(Self {
            id,
            name,
            route_name,
            route_code,
            direction_raw,
            route_direction: None,
            coordinates,
            facilities: Vec::new(),
        })
    }
}

/// Highway access point, used only as a directional reference via its
/// ordinal `weight` along the highway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interchange {
    pub id: String,
    pub name: String,
    pub route_name: String,
    pub route_no: Option<String>,
    pub direction: Direction,
    /// Ordinal position along the highway, increasing in one canonical
    /// direction. Comparing weights of interchanges met in travel order
    /// tells which carriageway the route is on.
    pub weight: i32,
    pub coordinates: Coordinate,
    pub prev_id: Option<String>,
    pub next_id: Option<String>,
}

pub(crate) fn string_field(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
}
