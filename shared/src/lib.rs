use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Structural WGS84 validity. The stricter domestic bounding box lives
    /// in the backend; this only rejects values that cannot be coordinates.
    pub fn is_wgs84(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Carriageway direction of a rest area or interchange.
///
/// UP is the carriageway running toward the capital, DOWN the one running
/// away from it; BOTH marks facilities serving both carriageways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Both,
    Unknown,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            other => other,
        }
    }
}

/// How complete the enrichment data for one rest area turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRestAreasRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_interval_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_direction_filter: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_strict_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_stores: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_facilities: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighwaySection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_code: Option<String>,
    pub start_km: f64,
    pub end_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteInfo {
    pub total_distance_km: f64,
    pub total_duration_min: f64,
    pub highway_sections: Vec<HighwaySection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEntry {
    pub store_code: String,
    pub store_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub popular_items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestAreaEntry {
    pub name: String,
    pub location: Coordinate,
    pub route_name: String,
    pub direction: Direction,
    pub distance_from_start_km: f64,
    pub distance_to_route_km: f64,
    pub estimated_time_min: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_next_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_next_min: Option<u32>,
    pub confidence: f64,
    pub facilities: Vec<String>,
    pub stores: Vec<StoreEntry>,
    pub data_quality: DataQuality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_rest_areas: usize,
    pub average_interval_km: f64,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRestAreasResponse {
    pub route_info: RouteInfo,
    pub rest_areas: Vec<RestAreaEntry>,
    pub analysis_summary: AnalysisSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
