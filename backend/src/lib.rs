pub mod config;
pub mod database;
pub mod direction;
pub mod enrichment;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod proximity;
pub mod spacing;
pub mod sync;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use shared::{
    AnalysisSummary, Coordinate, HighwaySection, RestAreaEntry, RouteInfo, RouteRestAreasRequest,
    RouteRestAreasResponse,
};

use crate::config::FilterConfig;
use crate::database::RestAreaStore;
use crate::direction::DirectionFiltered;
use crate::enrichment::enrich_selection;
use crate::error::ServiceError;
use crate::extract::is_domestic;
use crate::models::Interchange;
use crate::pipeline::{relevant_route_names, select_rest_areas};
use crate::providers::{ProviderRoute, RouteProvider};

/// Origin and destination closer than this are rejected as a non-route.
const MIN_TRIP_KM: f64 = 0.5;

pub struct AppState<P, S> {
    pub provider: Arc<P>,
    pub store: Arc<S>,
    pub defaults: FilterConfig,
}

impl<P, S> Clone for AppState<P, S> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            store: self.store.clone(),
            defaults: self.defaults.clone(),
        }
    }
}

pub fn create_router<P: RouteProvider, S: RestAreaStore>(state: AppState<P, S>) -> Router {
    Router::new()
        .route(
            "/api/route/rest-areas",
            post(rest_areas_post::<P, S>).get(rest_areas_get::<P, S>),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn rest_areas_post<P: RouteProvider, S: RestAreaStore>(
    State(state): State<AppState<P, S>>,
    Json(req): Json<RouteRestAreasRequest>,
) -> Result<Json<RouteRestAreasResponse>, ServiceError> {
    let response = handle_rest_areas(&state, &req, None).await?;
    Ok(Json(response))
}

/// Query-string variant of the same lookup, with an optional along-route
/// window in km for partial trips.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestAreaQuery {
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub start_km: Option<f64>,
    pub end_km: Option<f64>,
    pub max_distance_km: Option<f64>,
    pub min_interval_km: Option<f64>,
    pub max_results: Option<usize>,
}

async fn rest_areas_get<P: RouteProvider, S: RestAreaStore>(
    State(state): State<AppState<P, S>>,
    Query(query): Query<RestAreaQuery>,
) -> Result<Json<RouteRestAreasResponse>, ServiceError> {
    let window = match (query.start_km, query.end_km) {
        (None, None) => None,
        (start, end) => {
            let start = start.unwrap_or(0.0);
            let end = end.unwrap_or(f64::INFINITY);
            if start < 0.0 || end < start {
                return Err(ServiceError::InvalidInput(format!(
                    "invalid along-route window [{start}, {end}]"
                )));
            }
            Some((start, end))
        }
    };

    let req = RouteRestAreasRequest {
        origin: Coordinate::new(query.origin_lat, query.origin_lng),
        destination: Coordinate::new(query.dest_lat, query.dest_lng),
        max_distance_km: query.max_distance_km,
        min_interval_km: query.min_interval_km,
        max_results: query.max_results,
        enable_direction_filter: None,
        direction_strict_mode: None,
        confidence_threshold: None,
        include_stores: None,
        include_facilities: None,
    };

    let response = handle_rest_areas(&state, &req, window).await?;
    Ok(Json(response))
}

async fn handle_rest_areas<P: RouteProvider, S: RestAreaStore>(
    state: &AppState<P, S>,
    req: &RouteRestAreasRequest,
    window: Option<(f64, f64)>,
) -> Result<RouteRestAreasResponse, ServiceError> {
    validate_endpoints(req.origin, req.destination)?;
    let cfg = state.defaults.with_request(req);

    let route = state
        .provider
        .fetch_route(req.origin, req.destination)
        .await?;
    tracing::info!(
        points = route.path.len(),
        distance_km = route.distance_km,
        "route computed"
    );

    let candidates = state.store.load_rest_areas().await?;

    let route_names = relevant_route_names(&route.path, &candidates, cfg.max_distance_km);
    let interchanges = if route_names.is_empty() {
        Vec::new()
    } else {
        state.store.load_interchanges(&route_names).await?
    };
    let interchanges_by_route = group_by_route(interchanges);

    let mut selection = select_rest_areas(&route.path, &candidates, &interchanges_by_route, &cfg)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    if let Some((start_km, end_km)) = window {
        selection.retain(|s| {
            s.distance_from_start_km >= start_km && s.distance_from_start_km <= end_km
        });
    }
    tracing::info!(selected = selection.len(), "rest areas selected");

    let highway_sections = highway_sections(&selection);
    let rest_areas = enrich_selection(state.store.clone(), selection, &cfg.enrichment).await;

    Ok(RouteRestAreasResponse {
        route_info: RouteInfo {
            total_distance_km: route.distance_km,
            total_duration_min: route.duration_min,
            highway_sections,
        },
        analysis_summary: summarize(&rest_areas),
        rest_areas,
    })
}

fn validate_endpoints(origin: Coordinate, destination: Coordinate) -> Result<(), ServiceError> {
    for (label, point) in [("origin", origin), ("destination", destination)] {
        if !point.is_wgs84() {
            return Err(ServiceError::InvalidInput(format!(
                "{label} is not a valid WGS84 coordinate: ({}, {})",
                point.lat, point.lng
            )));
        }
        if !is_domestic(point) {
            return Err(ServiceError::InvalidInput(format!(
                "{label} is outside the service area: ({}, {})",
                point.lat, point.lng
            )));
        }
    }
    if crate::geometry::haversine_km(origin, destination) < MIN_TRIP_KM {
        return Err(ServiceError::InvalidInput(
            "origin and destination are the same point".to_string(),
        ));
    }
    Ok(())
}

fn group_by_route(interchanges: Vec<Interchange>) -> HashMap<String, Vec<Interchange>> {
    let mut grouped: HashMap<String, Vec<Interchange>> = HashMap::new();
    for ic in interchanges {
        grouped.entry(ic.route_name.clone()).or_default().push(ic);
    }
    grouped
}

/// Contiguous runs of selected rest areas on the same named route, as a
/// coarse "which highways does this trip use" summary.
fn highway_sections(selection: &[DirectionFiltered]) -> Vec<HighwaySection> {
    let mut sections: Vec<HighwaySection> = Vec::new();
    for item in selection {
        if item.candidate.route_name.is_empty() {
            continue;
        }
        match sections.last_mut() {
            Some(last) if last.name == item.candidate.route_name => {
                last.end_km = item.distance_from_start_km;
            }
            _ => sections.push(HighwaySection {
                name: item.candidate.route_name.clone(),
                route_code: item.candidate.route_code.clone(),
                start_km: item.distance_from_start_km,
                end_km: item.distance_from_start_km,
            }),
        }
    }
    sections
}

fn summarize(rest_areas: &[RestAreaEntry]) -> AnalysisSummary {
    let gaps: Vec<f64> = rest_areas
        .windows(2)
        .map(|pair| pair[1].distance_from_start_km - pair[0].distance_from_start_km)
        .collect();
    let average_interval_km = if gaps.is_empty() {
        0.0
    } else {
        gaps.iter().sum::<f64>() / gaps.len() as f64
    };
    AnalysisSummary {
        total_rest_areas: rest_areas.len(),
        average_interval_km,
        generated_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Straight-line fallback route used when no directions provider is
/// configured. Interpolates the great-circle chord and estimates duration
/// at highway speed.
pub struct StraightLineProvider;

impl RouteProvider for StraightLineProvider {
    async fn fetch_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<ProviderRoute, crate::providers::ProviderError> {
        const STEPS: usize = 20;
        let path: Vec<Coordinate> = (0..=STEPS)
            .map(|i| {
                let t = i as f64 / STEPS as f64;
                Coordinate {
                    lat: origin.lat + (destination.lat - origin.lat) * t,
                    lng: origin.lng + (destination.lng - origin.lng) * t,
                }
            })
            .collect();
        let distance_km = crate::geometry::haversine_km(origin, destination);
        Ok(ProviderRoute {
            path,
            distance_km,
            duration_min: distance_km / 80.0 * 60.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{DataQuality, Direction};

    fn entry(name: &str, along: f64) -> RestAreaEntry {
        RestAreaEntry {
            name: name.to_string(),
            location: Coordinate::new(36.5, 127.3),
            route_name: "경부선".to_string(),
            direction: Direction::Down,
            distance_from_start_km: along,
            distance_to_route_km: 1.0,
            estimated_time_min: 0,
            distance_to_next_km: None,
            time_to_next_min: None,
            confidence: 1.0,
            facilities: Vec::new(),
            stores: Vec::new(),
            data_quality: DataQuality::High,
        }
    }

    #[test]
    fn validation_rejects_foreign_and_degenerate_trips() {
        let seoul = Coordinate::new(37.55, 127.0);
        let busan = Coordinate::new(35.18, 129.07);
        let tokyo = Coordinate::new(35.69, 139.69);

        assert!(validate_endpoints(seoul, busan).is_ok());
        assert!(matches!(
            validate_endpoints(seoul, tokyo),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_endpoints(seoul, seoul),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_endpoints(Coordinate::new(95.0, 127.0), busan),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn summary_averages_gaps() {
        let areas = vec![entry("a", 10.0), entry("b", 40.0), entry("c", 90.0)];
        let summary = summarize(&areas);
        assert_eq!(summary.total_rest_areas, 3);
        assert!((summary.average_interval_km - 40.0).abs() < 1e-9);

        let empty = summarize(&[]);
        assert_eq!(empty.total_rest_areas, 0);
        assert_eq!(empty.average_interval_km, 0.0);
    }

    #[tokio::test]
    async fn straight_line_provider_spans_the_trip() {
        let route = StraightLineProvider
            .fetch_route(Coordinate::new(37.55, 127.0), Coordinate::new(35.18, 129.07))
            .await
            .unwrap();
        assert_eq!(route.path.len(), 21);
        assert_eq!(route.path[0], Coordinate::new(37.55, 127.0));
        assert_eq!(route.path[20], Coordinate::new(35.18, 129.07));
        assert!(route.distance_km > 300.0);
    }
}
