//! Spacing/deduplication selection over direction-filtered candidates.
//!
//! Rest areas cluster around interchanges and service towns; presenting
//! three entries 2 km apart helps nobody. Two passes: collapse each
//! proximity cluster to its best representative, then walk the survivors
//! enforcing the global minimum interval, then cap the count.

use crate::direction::DirectionFiltered;

/// Select spaced entries from candidates already sorted by
/// `distance_from_start_km` (the proximity filter guarantees that order).
pub fn select_spaced(
    candidates: Vec<DirectionFiltered>,
    min_interval_km: f64,
    max_results: usize,
) -> Vec<DirectionFiltered> {
    let representatives = cluster_representatives(candidates, min_interval_km);

    // Greedy spacing walk. Representatives are cluster-local winners; the
    // global interval still needs re-checking across cluster boundaries.
    let mut selected: Vec<DirectionFiltered> = Vec::new();
    for item in representatives {
        match selected.last() {
            Some(last) if item.distance_from_start_km - last.distance_from_start_km
                < min_interval_km => {}
            _ => selected.push(item),
        }
    }

    selected.truncate(max_results);
    selected
}

/// Group runs of candidates closer than `min_interval_km` to each other and
/// keep the highest-confidence member of each run. Ties go to the earlier
/// candidate, then to the smaller id, so re-runs give identical output.
fn cluster_representatives(
    candidates: Vec<DirectionFiltered>,
    min_interval_km: f64,
) -> Vec<DirectionFiltered> {
    let mut reps: Vec<DirectionFiltered> = Vec::new();
    let mut cluster: Vec<DirectionFiltered> = Vec::new();

    for item in candidates {
        let starts_new_cluster = cluster.last().map_or(false, |prev| {
            item.distance_from_start_km - prev.distance_from_start_km >= min_interval_km
        });
        if starts_new_cluster {
            if let Some(best) = take_best(&mut cluster) {
                reps.push(best);
            }
        }
        cluster.push(item);
    }
    if let Some(best) = take_best(&mut cluster) {
        reps.push(best);
    }

    reps
}

fn take_best(cluster: &mut Vec<DirectionFiltered>) -> Option<DirectionFiltered> {
    if cluster.is_empty() {
        return None;
    }
    let mut best_idx = 0;
    for (i, item) in cluster.iter().enumerate().skip(1) {
        let best = &cluster[best_idx];
        let better = item.confidence > best.confidence
            || (item.confidence == best.confidence
                && (item.distance_from_start_km < best.distance_from_start_km
                    || (item.distance_from_start_km == best.distance_from_start_km
                        && item.candidate.id < best.candidate.id)));
        if better {
            best_idx = i;
        }
    }
    let best = cluster.swap_remove(best_idx);
    cluster.clear();
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::DirectionVerdict;
    use crate::models::RestAreaCandidate;
    use shared::Coordinate;

    fn entry(id: &str, along_km: f64, confidence: f64) -> DirectionFiltered {
        DirectionFiltered {
            candidate: RestAreaCandidate {
                id: id.to_string(),
                name: format!("{id}휴게소"),
                route_name: "경부선".to_string(),
                route_code: None,
                direction_raw: None,
                route_direction: None,
                coordinates: Some(Coordinate::new(36.5, 127.0)),
                facilities: Vec::new(),
            },
            distance_to_route_km: 1.0,
            distance_from_start_km: along_km,
            verdict: DirectionVerdict::Unknown,
            confidence,
        }
    }

    fn ids(selected: &[DirectionFiltered]) -> Vec<&str> {
        selected.iter().map(|s| s.candidate.id.as_str()).collect()
    }

    #[test]
    fn enforces_minimum_interval() {
        let input = vec![
            entry("a", 10.0, 0.9),
            entry("b", 14.0, 0.5),
            entry("c", 30.0, 0.9),
            entry("d", 55.0, 0.9),
        ];
        let out = select_spaced(input, 15.0, 10);
        for pair in out.windows(2) {
            assert!(
                pair[1].distance_from_start_km - pair[0].distance_from_start_km >= 15.0
            );
        }
        assert_eq!(ids(&out), vec!["a", "c", "d"]);
    }

    #[test]
    fn cluster_prefers_higher_confidence() {
        let input = vec![
            entry("weak", 10.0, 0.4),
            entry("strong", 12.0, 0.95),
            entry("later", 40.0, 0.6),
        ];
        let out = select_spaced(input, 15.0, 10);
        assert_eq!(ids(&out), vec!["strong", "later"]);
    }

    #[test]
    fn truncates_to_max_results_keeping_earliest() {
        let input: Vec<_> = (0..10)
            .map(|i| entry(&format!("r{i}"), i as f64 * 20.0, 0.8))
            .collect();
        let out = select_spaced(input, 10.0, 4);
        assert_eq!(out.len(), 4);
        assert_eq!(ids(&out), vec!["r0", "r1", "r2", "r3"]);
    }

    #[test]
    fn single_candidate_is_always_selected() {
        let out = select_spaced(vec![entry("only", 5.0, 0.3)], 25.0, 10);
        assert_eq!(ids(&out), vec!["only"]);
    }

    #[test]
    fn deterministic_on_ties() {
        let input = vec![entry("b", 10.0, 0.7), entry("a", 10.0, 0.7)];
        // Same along-distance and confidence; smaller id wins.
        let out = select_spaced(input, 15.0, 10);
        assert_eq!(ids(&out), vec!["a"]);
    }
}
