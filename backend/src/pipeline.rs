//! Pure composition of the filter stages: proximity → direction → spacing.
//!
//! Everything here is synchronous and deterministic; the HTTP layer owns
//! the I/O (route provider, datastore, enrichment) around it. Running the
//! pipeline twice over identical inputs yields identical output.

use std::collections::HashMap;

use thiserror::Error;

use shared::Coordinate;

use crate::config::FilterConfig;
use crate::direction::{filter_by_direction, DirectionFiltered};
use crate::models::{Interchange, RestAreaCandidate};
use crate::proximity::filter_by_proximity;
use crate::spacing::select_spaced;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("route polyline must contain at least 2 points, got {0}")]
    DegeneratePolyline(usize),
}

/// Run the full selection over a route polyline. An empty *result* is a
/// normal outcome (there may simply be no rest areas); only a degenerate
/// polyline is an error.
pub fn select_rest_areas(
    polyline: &[Coordinate],
    candidates: &[RestAreaCandidate],
    interchanges_by_route: &HashMap<String, Vec<Interchange>>,
    cfg: &FilterConfig,
) -> Result<Vec<DirectionFiltered>, PipelineError> {
    if polyline.len() < 2 {
        return Err(PipelineError::DegeneratePolyline(polyline.len()));
    }

    let near = filter_by_proximity(polyline, candidates, cfg.max_distance_km);
    tracing::debug!(
        candidates = candidates.len(),
        near = near.len(),
        "proximity filter applied"
    );

    let oriented = filter_by_direction(polyline, near, interchanges_by_route, cfg);
    tracing::debug!(oriented = oriented.len(), "direction filter applied");

    Ok(select_spaced(oriented, cfg.min_interval_km, cfg.max_results))
}

/// Route names of candidates close to the polyline; the handler loads
/// interchanges only for these before running the full selection.
pub fn relevant_route_names(
    polyline: &[Coordinate],
    candidates: &[RestAreaCandidate],
    max_distance_km: f64,
) -> Vec<String> {
    let mut names: Vec<String> = filter_by_proximity(polyline, candidates, max_distance_km)
        .into_iter()
        .map(|m| m.candidate.route_name)
        .filter(|n| !n.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Direction;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate { lat, lng }
    }

    // A synthetic Seoul → Busan style polyline: south then east.
    fn seoul_busan_polyline() -> Vec<Coordinate> {
        let mut line: Vec<Coordinate> = (0..=60)
            .map(|i| c(37.55 - i as f64 * 0.03, 127.0 + i as f64 * 0.02))
            .collect();
        line.push(c(35.18, 129.07));
        line
    }

    fn on_route(line: &[Coordinate], frac: f64, offset_lng: f64) -> Coordinate {
        let idx = ((line.len() - 1) as f64 * frac) as usize;
        let p = line[idx];
        c(p.lat, p.lng + offset_lng)
    }

    fn candidate(id: &str, coord: Coordinate, direction: Option<&str>) -> RestAreaCandidate {
        RestAreaCandidate {
            id: id.to_string(),
            name: format!("{id}휴게소"),
            route_name: "경부선".to_string(),
            route_code: Some("0010".to_string()),
            direction_raw: direction.map(str::to_string),
            route_direction: None,
            coordinates: Some(coord),
            facilities: Vec::new(),
        }
    }

    fn scenario_config() -> FilterConfig {
        FilterConfig {
            max_distance_km: 5.0,
            min_interval_km: 20.0,
            max_results: 15,
            enable_direction_filter: true,
            direction_strict_mode: false,
            confidence_threshold: 0.3,
            ..FilterConfig::default()
        }
    }

    #[test]
    fn degenerate_polyline_is_rejected() {
        let cfg = FilterConfig::default();
        let err = select_rest_areas(&[c(37.0, 127.0)], &[], &HashMap::new(), &cfg);
        assert!(matches!(err, Err(PipelineError::DegeneratePolyline(1))));
    }

    #[test]
    fn no_candidates_is_empty_not_an_error() {
        let cfg = FilterConfig::default();
        let out =
            select_rest_areas(&seoul_busan_polyline(), &[], &HashMap::new(), &cfg).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn seoul_busan_scenario_respects_all_limits() {
        let line = seoul_busan_polyline();
        let cfg = scenario_config();

        // Rest areas sprinkled along the route, mixed directions, one far
        // outlier and one opposite-carriageway entry.
        let mut candidates: Vec<RestAreaCandidate> = (1..30)
            .map(|i| {
                let dir = if i % 3 == 0 { Some("부산방향") } else { None };
                candidate(&format!("c{i:02}"), on_route(&line, i as f64 / 30.0, 0.01), dir)
            })
            .collect();
        candidates.push(candidate("opposite", on_route(&line, 0.5, 0.01), Some("서울방향")));
        candidates.push(candidate("faraway", c(36.0, 126.0), Some("부산방향")));

        let out = select_rest_areas(&line, &candidates, &HashMap::new(), &cfg).unwrap();

        assert!(!out.is_empty());
        assert!(out.len() <= 15);
        for pair in out.windows(2) {
            assert!(
                pair[1].distance_from_start_km - pair[0].distance_from_start_km >= 20.0,
                "interval violated: {} then {}",
                pair[0].distance_from_start_km,
                pair[1].distance_from_start_km
            );
        }
        assert!(out.iter().all(|s| s.candidate.id != "opposite"));
        assert!(out.iter().all(|s| s.candidate.id != "faraway"));
        assert!(out.iter().all(|s| s.confidence >= 0.3));
    }

    #[test]
    fn both_candidate_included_regardless_of_bearing() {
        let line = seoul_busan_polyline();
        let cfg = scenario_config();
        // ~3 km east of the midpoint of the route.
        let both = candidate("both", on_route(&line, 0.5, 0.033), Some("양방향"));
        let out = select_rest_areas(&line, &[both], &HashMap::new(), &cfg).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].candidate.id, "both");
    }

    #[test]
    fn beyond_max_distance_never_selected_even_with_matching_direction() {
        let line = seoul_busan_polyline();
        let cfg = scenario_config();
        let far = candidate("far", on_route(&line, 0.5, 0.12), Some("부산방향"));
        let out = select_rest_areas(&line, &[far], &HashMap::new(), &cfg).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn pipeline_is_idempotent() {
        let line = seoul_busan_polyline();
        let cfg = scenario_config();
        let candidates: Vec<RestAreaCandidate> = (1..20)
            .map(|i| candidate(&format!("c{i:02}"), on_route(&line, i as f64 / 20.0, 0.01), None))
            .collect();

        let a = select_rest_areas(&line, &candidates, &HashMap::new(), &cfg).unwrap();
        let b = select_rest_areas(&line, &candidates, &HashMap::new(), &cfg).unwrap();

        let ids = |v: &[DirectionFiltered]| {
            v.iter().map(|s| s.candidate.id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn relevant_route_names_deduplicates() {
        let line = seoul_busan_polyline();
        let candidates = vec![
            candidate("a", on_route(&line, 0.3, 0.01), None),
            candidate("b", on_route(&line, 0.6, 0.01), None),
        ];
        let names = relevant_route_names(&line, &candidates, 5.0);
        assert_eq!(names, vec!["경부선".to_string()]);
    }

    #[test]
    fn direction_verdicts_are_tagged_not_promoted() {
        let line = seoul_busan_polyline();
        let cfg = scenario_config();
        let unknown = candidate("u", on_route(&line, 0.4, 0.01), None);
        let certain = candidate("c", on_route(&line, 0.8, 0.01), Some("부산방향"));
        let out = select_rest_areas(&line, &[unknown, certain], &HashMap::new(), &cfg).unwrap();
        assert_eq!(out.len(), 2);
        let by_id = |id: &str| out.iter().find(|s| s.candidate.id == id).unwrap();
        assert!(matches!(by_id("u").verdict, crate::direction::DirectionVerdict::Unknown));
        assert!(matches!(
            by_id("c").verdict,
            crate::direction::DirectionVerdict::Certain(Direction::Down)
        ));
    }
}
