//! Route-proximity filtering: narrow the national candidate list down to
//! rest areas geometrically close to the computed polyline.

use shared::Coordinate;

use crate::geometry::project_onto_polyline;
use crate::models::RestAreaCandidate;

/// A candidate that survived the proximity cut, annotated with where it
/// sits relative to the route.
#[derive(Debug, Clone)]
pub struct ProximityMatch {
    pub candidate: RestAreaCandidate,
    pub distance_to_route_km: f64,
    /// Approximate arc length from the route origin to the candidate's
    /// projection. Used for ordering and spacing, never for the
    /// route-membership decision itself.
    pub distance_from_start_km: f64,
}

/// Keep candidates within `max_distance_km` of the polyline. Candidates
/// without an extractable coordinate are dropped, never defaulted.
/// Output is ordered by along-route distance, ties broken by id so the
/// result is deterministic.
pub fn filter_by_proximity(
    polyline: &[Coordinate],
    candidates: &[RestAreaCandidate],
    max_distance_km: f64,
) -> Vec<ProximityMatch> {
    let mut matches: Vec<ProximityMatch> = candidates
        .iter()
        .filter_map(|candidate| {
            let coord = candidate.coordinates?;
            let proj = project_onto_polyline(coord, polyline)?;
            if proj.distance_km > max_distance_km {
                return None;
            }
            Some(ProximityMatch {
                candidate: candidate.clone(),
                distance_to_route_km: proj.distance_km,
                distance_from_start_km: proj.along_km,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        a.distance_from_start_km
            .total_cmp(&b.distance_from_start_km)
            .then_with(|| a.candidate.id.cmp(&b.candidate.id))
    });
    matches
}
