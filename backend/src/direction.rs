//! Direction/orientation filtering.
//!
//! Decides whether a rest area sits on the carriageway a route actually
//! travels, or on the opposite one. This is a heuristic built from the
//! route's macro bearing, keyword-normalized direction strings and ordinal
//! interchange weights; it never consults turn restrictions or real lane
//! topology, so the result carries an explicit confidence instead of
//! pretending to be exact.

use std::collections::HashMap;

use shared::{Coordinate, Direction};

use crate::config::{DirectionKeywords, FilterConfig};
use crate::geometry::{point_to_polyline_km, project_onto_polyline};
use crate::models::{Interchange, RestAreaCandidate};
use crate::proximity::ProximityMatch;

/// Coarse travel bearing of the whole route, derived from its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteBearing {
    North,
    South,
    East,
    West,
    Unknown,
}

/// Endpoint deltas below this many degrees on both axes give no usable
/// bearing.
const BEARING_DELTA_MIN_DEG: f64 = 0.5;

pub fn route_bearing(polyline: &[Coordinate]) -> RouteBearing {
    let (Some(first), Some(last)) = (polyline.first(), polyline.last()) else {
        return RouteBearing::Unknown;
    };

    let dlat = last.lat - first.lat;
    let dlng = last.lng - first.lng;

    if dlat.abs() < BEARING_DELTA_MIN_DEG && dlng.abs() < BEARING_DELTA_MIN_DEG {
        return RouteBearing::Unknown;
    }

    match crate::geometry::bearing_deg(*first, *last) {
        b if !(45.0..315.0).contains(&b) => RouteBearing::North,
        b if b < 135.0 => RouteBearing::East,
        b if b < 225.0 => RouteBearing::South,
        _ => RouteBearing::West,
    }
}

impl RouteBearing {
    /// Carriageway a route with this bearing is expected to use. UP runs
    /// toward the capital in the north-west, so north- and west-bound
    /// travel maps to UP, south- and east-bound to DOWN.
    pub fn expected_direction(self) -> Direction {
        match self {
            RouteBearing::North | RouteBearing::West => Direction::Up,
            RouteBearing::South | RouteBearing::East => Direction::Down,
            RouteBearing::Unknown => Direction::Unknown,
        }
    }
}

/// Outcome of a direction decision. An inference is never promoted to a
/// certainty; callers that need to distinguish keep the variant around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DirectionVerdict {
    Certain(Direction),
    Inferred { direction: Direction, confidence: f64 },
    Unknown,
}

impl DirectionVerdict {
    pub fn confidence(self) -> f64 {
        match self {
            DirectionVerdict::Certain(_) => 1.0,
            DirectionVerdict::Inferred { confidence, .. } => confidence,
            DirectionVerdict::Unknown => UNKNOWN_CONFIDENCE,
        }
    }
}

/// Baseline confidence for candidates whose direction could not be
/// established at all. Above the default threshold so lenient mode keeps
/// them, below what strict mode demands. Tunable, not contractual.
const UNKNOWN_CONFIDENCE: f64 = 0.5;

/// A proximity survivor with its direction decision attached.
#[derive(Debug, Clone)]
pub struct DirectionFiltered {
    pub candidate: RestAreaCandidate,
    pub distance_to_route_km: f64,
    pub distance_from_start_km: f64,
    pub verdict: DirectionVerdict,
    pub confidence: f64,
}

/// Normalize a free-text direction string through keyword matching. BOTH
/// keywords are checked first: "양방향" contains no UP/DOWN marker but some
/// feeds write "상하행" which would otherwise match both lists.
pub fn normalize_direction(raw: &str, keywords: &DirectionKeywords) -> Direction {
    let raw = raw.trim();
    if raw.is_empty() {
        return Direction::Unknown;
    }
    if keywords.both.iter().any(|k| raw.contains(k.as_str())) {
        return Direction::Both;
    }
    if keywords.up.iter().any(|k| raw.contains(k.as_str())) {
        return Direction::Up;
    }
    if keywords.down.iter().any(|k| raw.contains(k.as_str())) {
        return Direction::Down;
    }
    Direction::Unknown
}

fn candidate_direction(candidate: &RestAreaCandidate, keywords: &DirectionKeywords) -> Direction {
    if let Some(d) = candidate.route_direction {
        if d != Direction::Unknown {
            return d;
        }
    }
    match &candidate.direction_raw {
        Some(raw) => normalize_direction(raw, keywords),
        None => Direction::Unknown,
    }
}

/// Infer which carriageway of `route_name` the route travels by comparing
/// the weights of interchanges met in travel order. Decreasing weight along
/// the route means UP (weights grow in the canonical DOWN direction).
///
/// Confidence grows with agreement: a single usable pair gives 0.5, and
/// every additional agreeing pair raises it, capped below certainty.
pub fn infer_route_direction(
    polyline: &[Coordinate],
    interchanges: &[Interchange],
    search_radius_km: f64,
) -> DirectionVerdict {
    // Keep one entry per physical interchange near the route, ordered by
    // where the route passes it.
    let mut seen: HashMap<&str, (f64, i32)> = HashMap::new();
    for ic in interchanges {
        let Some(dist) = point_to_polyline_km(ic.coordinates, polyline) else {
            continue;
        };
        if dist > search_radius_km {
            continue;
        }
        let Some(proj) = project_onto_polyline(ic.coordinates, polyline) else {
            continue;
        };
        // UP/DOWN rows of the same interchange share a name; the DOWN-row
        // weight is the canonical ordinal.
        let entry = seen.entry(ic.name.as_str()).or_insert((proj.along_km, ic.weight));
        if ic.direction == Direction::Down {
            *entry = (proj.along_km, ic.weight);
        }
    }

    let mut ordered: Vec<(f64, i32)> = seen.into_values().collect();
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

    if ordered.len() < 2 {
        return DirectionVerdict::Unknown;
    }

    let mut up_votes = 0usize;
    let mut down_votes = 0usize;
    for pair in ordered.windows(2) {
        match pair[0].1.cmp(&pair[1].1) {
            std::cmp::Ordering::Greater => up_votes += 1,
            std::cmp::Ordering::Less => down_votes += 1,
            std::cmp::Ordering::Equal => {}
        }
    }

    let total = up_votes + down_votes;
    if total == 0 {
        return DirectionVerdict::Unknown;
    }

    let (direction, agreeing) = if up_votes >= down_votes {
        (Direction::Up, up_votes)
    } else {
        (Direction::Down, down_votes)
    };

    let confidence = if total == 1 {
        0.5
    } else {
        (0.5 + 0.4 * agreeing as f64 / total as f64).min(0.9)
    };

    DirectionVerdict::Inferred { direction, confidence }
}

/// Apply the direction decision ladder to every proximity survivor.
///
/// `interchanges_by_route` maps a route name to all its interchanges; only
/// routes of surviving candidates need to be present.
pub fn filter_by_direction(
    polyline: &[Coordinate],
    matches: Vec<ProximityMatch>,
    interchanges_by_route: &HashMap<String, Vec<Interchange>>,
    cfg: &FilterConfig,
) -> Vec<DirectionFiltered> {
    let bearing = route_bearing(polyline);
    let expected = bearing.expected_direction();

    // Route-level inference is per highway, cache it across candidates.
    let mut inferred: HashMap<String, DirectionVerdict> = HashMap::new();

    let mut out = Vec::with_capacity(matches.len());
    for m in matches {
        let decision = decide(
            &m.candidate,
            expected,
            cfg,
            &mut inferred,
            polyline,
            interchanges_by_route,
        );

        let Some((verdict, confidence)) = decision else {
            continue;
        };

        out.push(DirectionFiltered {
            candidate: m.candidate,
            distance_to_route_km: m.distance_to_route_km,
            distance_from_start_km: m.distance_from_start_km,
            verdict,
            confidence,
        });
    }
    out
}

fn decide(
    candidate: &RestAreaCandidate,
    expected: Direction,
    cfg: &FilterConfig,
    inferred: &mut HashMap<String, DirectionVerdict>,
    polyline: &[Coordinate],
    interchanges_by_route: &HashMap<String, Vec<Interchange>>,
) -> Option<(DirectionVerdict, f64)> {
    let own = candidate_direction(candidate, &cfg.keywords);

    if !cfg.enable_direction_filter {
        let verdict = if own == Direction::Unknown {
            DirectionVerdict::Unknown
        } else {
            DirectionVerdict::Certain(own)
        };
        return Some((verdict, 1.0));
    }

    // Bidirectional facilities are reachable from either carriageway.
    if own == Direction::Both {
        return Some((DirectionVerdict::Certain(Direction::Both), 1.0));
    }

    if own != Direction::Unknown && expected != Direction::Unknown {
        if own == expected {
            return Some((DirectionVerdict::Certain(own), 1.0));
        }
        // Determinably on the opposite carriageway.
        return None;
    }

    // Raw direction (or the route bearing) gave nothing; fall back to
    // interchange-weight inference on the candidate's highway.
    let verdict = *inferred
        .entry(candidate.route_name.clone())
        .or_insert_with(|| {
            interchanges_by_route
                .get(&candidate.route_name)
                .map(|ics| infer_route_direction(polyline, ics, cfg.ic_search_radius_km))
                .unwrap_or(DirectionVerdict::Unknown)
        });

    match verdict {
        DirectionVerdict::Inferred { direction, confidence } => {
            // The inference tells which carriageway the route drives on
            // this highway.
            if own != Direction::Unknown && own != direction {
                return None;
            }
            if confidence < cfg.confidence_threshold {
                return None;
            }
            // A candidate certain about its own carriageway keeps that
            // tag; only the route-side signal was inferred.
            let verdict = if own == Direction::Unknown {
                DirectionVerdict::Inferred { direction, confidence }
            } else {
                DirectionVerdict::Certain(own)
            };
            Some((verdict, confidence))
        }
        // The inference cache never stores certainties.
        DirectionVerdict::Certain(direction) => Some((DirectionVerdict::Certain(direction), 1.0)),
        DirectionVerdict::Unknown => {
            // Strict mode refuses candidates whose match with the route
            // could not be established.
            let confidence = UNKNOWN_CONFIDENCE;
            if cfg.direction_strict_mode || confidence < cfg.confidence_threshold {
                return None;
            }
            let verdict = if own == Direction::Unknown {
                DirectionVerdict::Unknown
            } else {
                DirectionVerdict::Certain(own)
            };
            Some((verdict, confidence))
        }
    }
}
