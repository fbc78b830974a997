use shared::Coordinate;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlng = (dlng / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Minimum distance from `p` to the segment `[s, e]`.
///
/// The projection happens in a local planar approximation, which is
/// acceptable at the few-kilometre scale this service works at; the final
/// distance to the clamped point is still a haversine distance. The
/// endpoints lie on the segment, so their distances always bound the
/// result.
pub fn point_to_segment_km(p: Coordinate, s: Coordinate, e: Coordinate) -> f64 {
    let (_, closest) = project_onto_segment(p, s, e);
    haversine_km(p, closest)
        .min(haversine_km(p, s))
        .min(haversine_km(p, e))
}

/// Projection parameter (clamped to [0, 1]) and the clamped point itself.
/// Longitude deltas are scaled by the cosine of the segment's mean latitude
/// so a degree means the same ground distance on both axes.
fn project_onto_segment(p: Coordinate, s: Coordinate, e: Coordinate) -> (f64, Coordinate) {
    let cos_lat = ((s.lat + e.lat) / 2.0).to_radians().cos();
    let dx = (e.lng - s.lng) * cos_lat;
    let dy = e.lat - s.lat;
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        // Degenerate segment, both endpoints coincide.
        return (0.0, s);
    }

    let px = (p.lng - s.lng) * cos_lat;
    let py = p.lat - s.lat;
    let t = ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0);
    let closest = Coordinate {
        lat: s.lat + t * (e.lat - s.lat),
        lng: s.lng + t * (e.lng - s.lng),
    };
    (t, closest)
}

/// Minimum distance from `p` to a polyline. A single-point "polyline"
/// degrades to a point-to-point distance; an empty one is the caller's
/// input-validation problem and is reported as `None`.
pub fn point_to_polyline_km(p: Coordinate, line: &[Coordinate]) -> Option<f64> {
    match line {
        [] => None,
        [only] => Some(haversine_km(p, *only)),
        _ => Some(
            line.windows(2)
                .map(|w| point_to_segment_km(p, w[0], w[1]))
                .fold(f64::INFINITY, f64::min),
        ),
    }
}

pub fn polyline_length_km(line: &[Coordinate]) -> f64 {
    line.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

/// Where along a polyline a point sits.
#[derive(Debug, Clone, Copy)]
pub struct PolylineProjection {
    /// Index of the segment the point projects onto.
    pub segment: usize,
    /// Minimum distance from the point to the polyline, km.
    pub distance_km: f64,
    /// Arc length from the polyline start to the projected point, km.
    pub along_km: f64,
}

/// Project `p` onto the nearest segment of `line` and measure the cumulative
/// distance from the start up to that projection. Requires at least two
/// points.
pub fn project_onto_polyline(p: Coordinate, line: &[Coordinate]) -> Option<PolylineProjection> {
    if line.len() < 2 {
        return None;
    }

    let mut best: Option<PolylineProjection> = None;
    let mut cumulative = 0.0;

    for (i, w) in line.windows(2).enumerate() {
        let seg_len = haversine_km(w[0], w[1]);
        let (t, closest) = project_onto_segment(p, w[0], w[1]);
        let dist = haversine_km(p, closest);

        if best.map_or(true, |b| dist < b.distance_km) {
            best = Some(PolylineProjection {
                segment: i,
                distance_km: dist,
                along_km: cumulative + t * seg_len,
            });
        }
        cumulative += seg_len;
    }

    best
}

/// Forward azimuth from `start` to `end` in degrees, 0..360.
pub fn bearing_deg(start: Coordinate, end: Coordinate) -> f64 {
    let dlng = (end.lng - start.lng).to_radians();
    let lat1 = start.lat.to_radians();
    let lat2 = end.lat.to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate { lat, lng }
    }

    #[test]
    fn haversine_same_point_is_zero() {
        let p = c(37.5665, 126.978);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn haversine_seoul_busan_roughly_325km() {
        let seoul = c(37.5665, 126.978);
        let busan = c(35.1796, 129.0756);
        let d = haversine_km(seoul, busan);
        assert!((310.0..340.0).contains(&d), "got {d}");
    }

    #[test]
    fn segment_distance_degenerate_segment() {
        let p = c(36.0, 127.0);
        let s = c(36.5, 127.5);
        assert_eq!(point_to_segment_km(p, s, s), haversine_km(p, s));
    }

    #[test]
    fn segment_distance_projection_inside() {
        // Point abreast of the middle of a north-south segment.
        let p = c(36.5, 127.1);
        let s = c(36.0, 127.0);
        let e = c(37.0, 127.0);
        let d = point_to_segment_km(p, s, e);
        assert!(d < haversine_km(p, s));
        assert!(d < haversine_km(p, e));
        // ~0.1 degree of longitude at this latitude.
        assert!((7.0..11.0).contains(&d), "got {d}");
    }

    #[test]
    fn segment_distance_bounded_by_endpoints_on_long_segments() {
        // Segments spanning the whole peninsula stress the planar
        // approximation the most.
        let p = c(37.172, 126.586);
        let s = c(33.0, 125.1);
        let e = c(38.6, 129.9);
        let d = point_to_segment_km(p, s, e);
        assert!(d <= haversine_km(p, s).min(haversine_km(p, e)));

        let reversed = point_to_segment_km(p, e, s);
        assert!((d - reversed).abs() < 1e-6);
    }

    #[test]
    fn polyline_distance_empty_and_single() {
        let p = c(36.0, 127.0);
        assert!(point_to_polyline_km(p, &[]).is_none());
        let single = [c(36.5, 127.5)];
        assert_eq!(
            point_to_polyline_km(p, &single),
            Some(haversine_km(p, single[0]))
        );
    }

    #[test]
    fn projection_measures_along_route_distance() {
        let line = [c(36.0, 127.0), c(36.5, 127.0), c(37.0, 127.0)];
        // Abreast of the second vertex.
        let p = c(36.5, 127.05);
        let proj = project_onto_polyline(p, &line).unwrap();
        let half = polyline_length_km(&line) / 2.0;
        assert!((proj.along_km - half).abs() < 1.0, "got {}", proj.along_km);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = c(36.0, 127.0);
        assert!((bearing_deg(origin, c(37.0, 127.0)) - 0.0).abs() < 1.0);
        assert!((bearing_deg(origin, c(35.0, 127.0)) - 180.0).abs() < 1.0);
        assert!((bearing_deg(origin, c(36.0, 128.0)) - 90.0).abs() < 2.0);
        assert!((bearing_deg(origin, c(36.0, 126.0)) - 270.0).abs() < 2.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_coord() -> impl Strategy<Value = Coordinate> {
            (-90.0..=90.0, -180.0..=180.0).prop_map(|(lat, lng)| Coordinate { lat, lng })
        }

        fn domestic_coord() -> impl Strategy<Value = Coordinate> {
            (33.0..=39.0, 124.0..=132.0).prop_map(|(lat, lng)| Coordinate { lat, lng })
        }

        proptest! {
            #[test]
            fn prop_haversine_symmetric(a in valid_coord(), b in valid_coord()) {
                let ab = haversine_km(a, b);
                let ba = haversine_km(b, a);
                prop_assert!((ab - ba).abs() < 1e-10);
            }

            #[test]
            fn prop_haversine_identity(p in valid_coord()) {
                prop_assert_eq!(haversine_km(p, p), 0.0);
            }

            #[test]
            fn prop_haversine_triangle_inequality(
                a in valid_coord(),
                b in valid_coord(),
                c in valid_coord()
            ) {
                prop_assert!(haversine_km(a, c) <= haversine_km(a, b) + haversine_km(b, c) + 1e-6);
            }

            #[test]
            fn prop_segment_distance_bounded_by_endpoints(
                p in domestic_coord(),
                s in domestic_coord(),
                e in domestic_coord()
            ) {
                let d = point_to_segment_km(p, s, e);
                let to_ends = haversine_km(p, s).min(haversine_km(p, e));
                prop_assert!(d <= to_ends);
            }

            #[test]
            fn prop_polyline_distance_not_above_any_vertex_distance(
                p in domestic_coord(),
                line in prop::collection::vec(domestic_coord(), 2..12)
            ) {
                let d = point_to_polyline_km(p, &line).unwrap();
                let nearest_vertex = line
                    .iter()
                    .map(|v| haversine_km(p, *v))
                    .fold(f64::INFINITY, f64::min);
                prop_assert!(d <= nearest_vertex);
            }

            #[test]
            fn prop_along_distance_within_polyline_length(
                p in domestic_coord(),
                line in prop::collection::vec(domestic_coord(), 2..12)
            ) {
                let proj = project_onto_polyline(p, &line).unwrap();
                prop_assert!(proj.along_km >= 0.0);
                prop_assert!(proj.along_km <= polyline_length_km(&line) + 1e-6);
            }
        }
    }
}
