//! Result assembly: turn selected candidates into response entries, with
//! facility and store details fetched through a bounded fan-out.
//!
//! Detail lookups are per rest area and independent, so they run in a
//! JoinSet capped by a semaphore. A failed or timed-out lookup degrades
//! the entry's data quality instead of failing the request.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout, Duration};

use shared::{DataQuality, Direction, RestAreaEntry, StoreEntry};

use crate::config::EnrichmentConfig;
use crate::database::RestAreaStore;
use crate::direction::{DirectionFiltered, DirectionVerdict};

/// Assumed highway cruising speed for travel-time estimates.
const AVERAGE_SPEED_KMH: f64 = 80.0;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

pub fn estimated_minutes(distance_km: f64) -> u32 {
    (distance_km / AVERAGE_SPEED_KMH * 60.0).round() as u32
}

struct Fetched {
    index: usize,
    facilities: Option<Vec<String>>,
    stores: Option<Vec<StoreEntry>>,
}

/// Build response entries for the selected rest areas, in along-route
/// order, with `distance_to_next_km`/`time_to_next_min` linking each entry
/// to its successor.
pub async fn enrich_selection<S: RestAreaStore>(
    store: Arc<S>,
    selected: Vec<DirectionFiltered>,
    cfg: &EnrichmentConfig,
) -> Vec<RestAreaEntry> {
    let semaphore = Arc::new(Semaphore::new(cfg.max_concurrent.max(1)));
    let mut tasks: JoinSet<Fetched> = JoinSet::new();

    for (index, item) in selected.iter().enumerate() {
        let store = store.clone();
        let semaphore = semaphore.clone();
        let id = item.candidate.id.clone();
        let cfg = cfg.clone();
        tasks.spawn(async move {
            // Closed semaphore is unreachable; treat it as a skipped fetch.
            let Ok(_permit) = semaphore.acquire().await else {
                return Fetched { index, facilities: None, stores: None };
            };

            let facilities = if cfg.include_facilities {
                fetch_with_retry(&cfg, || store.fetch_facilities(&id)).await
            } else {
                Some(Vec::new())
            };
            let stores = if cfg.include_stores {
                fetch_with_retry(&cfg, || store.fetch_stores(&id)).await
            } else {
                Some(Vec::new())
            };

            Fetched { index, facilities, stores }
        });
    }

    let mut fetched: Vec<Option<Fetched>> = (0..selected.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => {
                let index = result.index;
                fetched[index] = Some(result);
            }
            Err(e) => tracing::warn!(error = %e, "enrichment task panicked"),
        }
    }

    let mut entries: Vec<RestAreaEntry> = Vec::with_capacity(selected.len());
    for (item, result) in selected.into_iter().zip(fetched) {
        let Some(location) = item.candidate.coordinates else {
            continue;
        };
        let (facilities, stores) = match result {
            Some(f) => (f.facilities, f.stores),
            None => (None, None),
        };
        let quality = data_quality(&facilities, &stores);
        if quality != DataQuality::High {
            tracing::debug!(id = %item.candidate.name, ?quality, "partial enrichment");
        }

        entries.push(RestAreaEntry {
            name: item.candidate.name,
            location,
            route_name: item.candidate.route_name,
            direction: verdict_direction(item.verdict),
            distance_from_start_km: item.distance_from_start_km,
            distance_to_route_km: item.distance_to_route_km,
            estimated_time_min: estimated_minutes(item.distance_from_start_km),
            distance_to_next_km: None,
            time_to_next_min: None,
            confidence: item.confidence,
            facilities: facilities.unwrap_or(item.candidate.facilities),
            stores: stores.unwrap_or_default(),
            data_quality: quality,
        });
    }

    link_successors(&mut entries);
    entries
}

async fn fetch_with_retry<T, F, Fut>(cfg: &EnrichmentConfig, mut fetch: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, crate::database::DatabaseError>>,
{
    for attempt in 0..=cfg.retries {
        match timeout(cfg.timeout, fetch()).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, attempt, "enrichment fetch failed");
            }
            Err(_) => {
                tracing::warn!(attempt, "enrichment fetch timed out");
            }
        }
        if attempt < cfg.retries {
            sleep(RETRY_BASE_DELAY * 2u32.pow(attempt)).await;
        }
    }
    None
}

fn data_quality(facilities: &Option<Vec<String>>, stores: &Option<Vec<StoreEntry>>) -> DataQuality {
    match (facilities.is_some(), stores.is_some()) {
        (true, true) => DataQuality::High,
        (false, false) => DataQuality::Low,
        _ => DataQuality::Medium,
    }
}

fn verdict_direction(verdict: DirectionVerdict) -> Direction {
    match verdict {
        DirectionVerdict::Certain(d) => d,
        DirectionVerdict::Inferred { direction, .. } => direction,
        DirectionVerdict::Unknown => Direction::Unknown,
    }
}

fn link_successors(entries: &mut [RestAreaEntry]) {
    for i in 0..entries.len().saturating_sub(1) {
        let gap = entries[i + 1].distance_from_start_km - entries[i].distance_from_start_km;
        entries[i].distance_to_next_km = Some(gap);
        entries[i].time_to_next_min = Some(estimated_minutes(gap));
    }
}
