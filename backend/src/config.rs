use std::time::Duration;

use shared::RouteRestAreasRequest;

/// Tuning for one pipeline invocation. One explicit value object passed to
/// the entry point instead of optional parameters threaded through every
/// layer; the defaults are documented here and nowhere else.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Candidates farther than this from the polyline are dropped, km.
    pub max_distance_km: f64,
    /// Minimum spacing between two selected rest areas, km.
    pub min_interval_km: f64,
    pub max_results: usize,
    pub enable_direction_filter: bool,
    /// Strict mode drops candidates whose direction could not be
    /// established at all; lenient mode keeps them with their inferred
    /// confidence.
    pub direction_strict_mode: bool,
    /// Minimum direction confidence for inclusion.
    pub confidence_threshold: f64,
    /// Interchanges farther than this from the polyline do not participate
    /// in direction inference, km.
    pub ic_search_radius_km: f64,
    pub keywords: DirectionKeywords,
    pub enrichment: EnrichmentConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_distance_km: 5.0,
            min_interval_km: 8.0,
            max_results: 20,
            enable_direction_filter: true,
            direction_strict_mode: false,
            confidence_threshold: 0.3,
            ic_search_radius_km: 2.0,
            keywords: DirectionKeywords::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl FilterConfig {
    /// Fold per-request overrides into a copy of the defaults.
    pub fn with_request(&self, req: &RouteRestAreasRequest) -> Self {
        let mut cfg = self.clone();
        if let Some(v) = req.max_distance_km {
            cfg.max_distance_km = v;
        }
        if let Some(v) = req.min_interval_km {
            cfg.min_interval_km = v;
        }
        if let Some(v) = req.max_results {
            cfg.max_results = v;
        }
        if let Some(v) = req.enable_direction_filter {
            cfg.enable_direction_filter = v;
        }
        if let Some(v) = req.direction_strict_mode {
            cfg.direction_strict_mode = v;
        }
        if let Some(v) = req.confidence_threshold {
            cfg.confidence_threshold = v;
        }
        if let Some(v) = req.include_stores {
            cfg.enrichment.include_stores = v;
        }
        if let Some(v) = req.include_facilities {
            cfg.enrichment.include_facilities = v;
        }
        cfg
    }
}

/// Keyword sets used to normalize free-text direction strings. These were
/// tuned against observed feed data and are data, not logic: swap them out
/// rather than special-casing new spellings in the filter.
#[derive(Debug, Clone)]
pub struct DirectionKeywords {
    pub both: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
}

impl Default for DirectionKeywords {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            both: owned(&["양방향", "상하행", "통합", "양측"]),
            up: owned(&["상행", "서울방향", "서울", "인천방향", "북향", "북쪽"]),
            down: owned(&["하행", "부산방향", "부산", "대구방향", "목포방향", "남향", "남쪽"]),
        }
    }
}

/// Bounds for the enrichment fan-out: bounded parallelism, one timeout per
/// fetch, idempotent-read retries only.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub include_stores: bool,
    pub include_facilities: bool,
    pub max_concurrent: usize,
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            include_stores: true,
            include_facilities: true,
            max_concurrent: 3,
            timeout: Duration::from_secs(15),
            retries: 2,
        }
    }
}
