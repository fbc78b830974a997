use std::collections::HashMap;

use backend::config::FilterConfig;
use backend::models::RestAreaCandidate;
use backend::pipeline::select_rest_areas;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shared::Coordinate;

fn synthetic_polyline(points: usize) -> Vec<Coordinate> {
    (0..points)
        .map(|i| {
            let t = i as f64 / points as f64;
            Coordinate::new(37.55 - t * 2.37, 127.0 + t * 2.07)
        })
        .collect()
}

fn synthetic_candidates(polyline: &[Coordinate], count: usize) -> Vec<RestAreaCandidate> {
    (0..count)
        .map(|i| {
            let idx = (i * polyline.len() / count).min(polyline.len() - 1);
            let p = polyline[idx];
            // A third of the candidates sit too far from the route.
            let offset = if i % 3 == 0 { 0.15 } else { 0.01 };
            let direction = match i % 4 {
                0 => Some("부산방향".to_string()),
                1 => Some("서울방향".to_string()),
                2 => Some("양방향".to_string()),
                _ => None,
            };
            RestAreaCandidate {
                id: format!("r{i:04}"),
                name: format!("r{i:04}휴게소"),
                route_name: format!("route{}", i % 7),
                route_code: None,
                direction_raw: direction,
                route_direction: None,
                coordinates: Some(Coordinate::new(p.lat, p.lng + offset)),
                facilities: Vec::new(),
            }
        })
        .collect()
}

fn benchmark_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("rest_area_selection");
    let cfg = FilterConfig::default();
    let interchanges = HashMap::new();

    for (polyline_points, candidate_count) in [(500, 200), (2000, 500), (8000, 2000)] {
        let polyline = synthetic_polyline(polyline_points);
        let candidates = synthetic_candidates(&polyline, candidate_count);
        let name = format!("{polyline_points}pts_{candidate_count}cands");

        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &(polyline, candidates),
            |b, (polyline, candidates)| {
                b.iter(|| {
                    select_rest_areas(
                        black_box(polyline),
                        black_box(candidates),
                        &interchanges,
                        &cfg,
                    )
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_selection);
criterion_main!(benches);
