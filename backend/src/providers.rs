//! Outbound HTTP clients: the Kakao Mobility directions API for route
//! polylines and the expressway open-data portal for reference records.
//!
//! Both upstreams are outside our availability budget, so every call site
//! gets a typed error it can map to a gateway-style HTTP status.

use std::env;
use std::future::Future;

use serde::Deserialize;
use serde_json::Value;
use tokio::time::{sleep, Duration};

use shared::Coordinate;

pub const KAKAO_BASE_URL: &str = "https://apis-navi.kakaomobility.com";
pub const OPEN_DATA_BASE_URL: &str = "https://data.ex.co.kr/openapi";

const OPEN_DATA_PAGE_SIZE: usize = 100;
const OPEN_DATA_MAX_PAGES: u32 = 50;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Upstream response could not be parsed: {0}")]
    BadResponse(String),

    #[error("No drivable route between the given points")]
    NoRoute,

    #[error("Provider configuration error: {0}")]
    Config(String),
}

/// A computed route as the rest of the service consumes it.
#[derive(Debug, Clone)]
pub struct ProviderRoute {
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    pub duration_min: f64,
}

/// Anything that can turn an origin/destination pair into a route.
/// The HTTP layer is generic over this so tests can drive the full router
/// without network access.
pub trait RouteProvider: Send + Sync + 'static {
    fn fetch_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = Result<ProviderRoute, ProviderError>> + Send;
}

#[derive(Debug, Deserialize)]
struct KakaoResponse {
    routes: Vec<KakaoRoute>,
}

#[derive(Debug, Deserialize)]
struct KakaoRoute {
    result_code: i32,
    #[serde(default)]
    result_msg: String,
    summary: Option<KakaoSummary>,
    #[serde(default)]
    sections: Vec<KakaoSection>,
}

#[derive(Debug, Deserialize)]
struct KakaoSummary {
    /// Meters.
    distance: f64,
    /// Seconds.
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct KakaoSection {
    #[serde(default)]
    roads: Vec<KakaoRoad>,
}

#[derive(Debug, Deserialize)]
struct KakaoRoad {
    /// Flat [lng, lat, lng, lat, ...] pairs.
    #[serde(default)]
    vertexes: Vec<f64>,
}

/// Kakao Mobility car directions client.
pub struct KakaoDirections {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl KakaoDirections {
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = env::var("KAKAO_REST_API_KEY").map_err(|_| {
            ProviderError::Config("KAKAO_REST_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(KAKAO_BASE_URL.to_string(), api_key))
    }

    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }
}

impl RouteProvider for KakaoDirections {
    async fn fetch_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<ProviderRoute, ProviderError> {
        let url = format!("{}/v1/directions", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("KakaoAK {}", self.api_key))
            .query(&[
                ("origin", format!("{},{}", origin.lng, origin.lat)),
                ("destination", format!("{},{}", destination.lng, destination.lat)),
                ("priority", "TIME".to_string()),
                ("alternatives", "false".to_string()),
                ("road_details", "true".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        let body: KakaoResponse = response.json().await?;
        parse_kakao_route(body)
    }
}

fn parse_kakao_route(body: KakaoResponse) -> Result<ProviderRoute, ProviderError> {
    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or(ProviderError::NoRoute)?;

    if route.result_code != 0 {
        tracing::warn!(
            code = route.result_code,
            msg = %route.result_msg,
            "directions api rejected the request"
        );
        return Err(ProviderError::NoRoute);
    }

    let summary = route
        .summary
        .ok_or_else(|| ProviderError::BadResponse("route without summary".to_string()))?;

    let mut path: Vec<Coordinate> = Vec::new();
    for section in &route.sections {
        for road in &section.roads {
            for pair in road.vertexes.chunks_exact(2) {
                path.push(Coordinate {
                    lng: pair[0],
                    lat: pair[1],
                });
            }
        }
    }

    if path.len() < 2 {
        return Err(ProviderError::BadResponse(
            "route polyline has fewer than 2 points".to_string(),
        ));
    }

    Ok(ProviderRoute {
        path,
        distance_km: summary.distance / 1000.0,
        duration_min: summary.duration / 60.0,
    })
}

#[derive(Debug, Deserialize)]
struct OpenDataPage {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    list: Option<Vec<Value>>,
}

/// Client for the expressway open-data portal. Endpoints share one
/// envelope: `{count, code, message, list}` with at most 100 records per
/// page.
pub struct HighwayDataClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retries: u32,
}

impl HighwayDataClient {
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = env::var("HIGHWAY_API_KEY").map_err(|_| {
            ProviderError::Config("HIGHWAY_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(OPEN_DATA_BASE_URL.to_string(), api_key))
    }

    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            retries: 2,
        }
    }

    /// All rest area location records, across pages.
    pub async fn fetch_rest_areas(&self) -> Result<Vec<Value>, ProviderError> {
        self.fetch_all("locationinfo/locationinfoRest").await
    }

    /// All interchange location records, across pages.
    pub async fn fetch_interchanges(&self) -> Result<Vec<Value>, ProviderError> {
        self.fetch_all("locationinfo/locationinfoIc").await
    }

    async fn fetch_all(&self, endpoint: &str) -> Result<Vec<Value>, ProviderError> {
        let mut records: Vec<Value> = Vec::new();
        let mut page_no: u32 = 1;

        loop {
            let page = self.fetch_page(endpoint, page_no).await?;

            if let Some(code) = &page.code {
                if code != "SUCCESS" {
                    return Err(ProviderError::BadResponse(format!(
                        "{endpoint} page {page_no}: {} ({})",
                        code,
                        page.message.as_deref().unwrap_or("no message")
                    )));
                }
            }

            let Some(list) = page.list else {
                return Err(ProviderError::BadResponse(format!(
                    "{endpoint} page {page_no}: missing list"
                )));
            };
            let page_len = list.len();
            records.extend(list);
            tracing::debug!(endpoint, page_no, page_len, total = records.len(), "page fetched");

            let done_by_count = page
                .count
                .is_some_and(|count| records.len() as u64 >= count);
            if page_len < OPEN_DATA_PAGE_SIZE || done_by_count || page_no >= OPEN_DATA_MAX_PAGES {
                break;
            }
            page_no += 1;
        }

        tracing::info!(endpoint, total = records.len(), "open data fetch complete");
        Ok(records)
    }

    async fn fetch_page(&self, endpoint: &str, page_no: u32) -> Result<OpenDataPage, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut last_err: Option<ProviderError> = None;

        for attempt in 0..=self.retries {
            let result = self
                .client
                .get(&url)
                .query(&[
                    ("key", self.api_key.as_str()),
                    ("type", "json"),
                    ("numOfRows", "100"),
                    ("pageNo", &page_no.to_string()),
                ])
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json::<OpenDataPage>().await?);
                }
                Ok(response) => {
                    tracing::warn!(endpoint, page_no, status = %response.status(), attempt, "page fetch rejected");
                    last_err = Some(ProviderError::Status(response.status()));
                }
                Err(e) => {
                    tracing::warn!(endpoint, page_no, error = %e, attempt, "page fetch failed");
                    last_err = Some(ProviderError::Request(e));
                }
            }
            if attempt < self.retries {
                sleep(RETRY_BASE_DELAY * 2u32.pow(attempt)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ProviderError::BadResponse("page fetch failed without error".to_string())
        }))
    }
}
