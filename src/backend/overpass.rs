//! Overpass API backend.
//!
//! Builds one Overpass QL query per cell and tries a list of mirror
//! endpoints in order until one succeeds.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use serde::Deserialize;

use super::{CellQuery, RawResult, SearchBackend};
use crate::error::BackendError;
use crate::sampler::Cell;

/// Overpass mirrors, in priority order.
pub static DEFAULT_ENDPOINTS: Lazy<Vec<String>> = Lazy::new(|| {
    vec![
        "https://overpass.kumi.systems/api/interpreter".to_string(),
        "https://maps.mail.ru/osm/tools/overpass/api/interpreter".to_string(),
        "https://overpass-api.de/api/interpreter".to_string(),
        "https://overpass.openstreetmap.ru/api/interpreter".to_string(),
    ]
});

/// Tag patterns for every category, unioned into each cell query.
///
/// The fetch is always unfiltered: the cache holds the full set and
/// category filters are applied locally.
pub static DEFAULT_PATTERNS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        r#"node["name"]["tourism"="attraction"]"#,
        r#"node["name"]["tourism"="museum"]"#,
        r#"node["name"]["historic"]"#,
        r#"node["name"]["memorial"]"#,
        r#"node["name"]["amenity"="place_of_worship"]"#,
        r#"node["name"]["tourism"="viewpoint"]"#,
        r#"node["name"]["natural"="spring"]"#,
        r#"node["name"]["natural"="peak"]"#,
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
});

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

pub struct OverpassBackend {
    client: reqwest::Client,
    endpoints: Vec<String>,
    patterns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassBackend {
    pub fn new() -> Result<Self, BackendError> {
        Self::with_endpoints(DEFAULT_ENDPOINTS.clone(), REQUEST_TIMEOUT)
    }

    pub fn from_config(config: &crate::config::EngineConfig) -> Result<Self, BackendError> {
        Self::with_endpoints(
            config.endpoints.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_endpoints(
        endpoints: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoints,
            patterns: DEFAULT_PATTERNS.clone(),
        })
    }

    /// One Overpass QL query for one cell.
    fn build_query(&self, query: &CellQuery) -> String {
        let filter = match query.cell {
            Cell::Rect {
                south,
                west,
                north,
                east,
            } => format!("({},{},{},{})", south, west, north, east),
            Cell::Around { lat, lon, radius_m } => {
                format!("(around:{:.0},{},{})", radius_m, lat, lon)
            }
        };
        let body: String = self
            .patterns
            .iter()
            .map(|p| format!("  {}{};\n", p, filter))
            .collect();
        format!(
            "[out:json][timeout:20];\n(\n{});\nout tags center qt {};\n",
            body, query.limit
        )
    }

    async fn try_endpoint(
        &self,
        endpoint: &str,
        query: &str,
    ) -> Result<OverpassResponse, BackendError> {
        let response = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(query.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                code: status.as_u16(),
            });
        }

        response
            .json::<OverpassResponse>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Try each mirror in order until one succeeds.
    ///
    /// A non-retryable client error aborts the loop immediately; retryable
    /// failures wait a short backoff and move to the next mirror. At most
    /// one attempt per endpoint.
    async fn post_query(&self, query: &str) -> Result<OverpassResponse, BackendError> {
        let mut last_error: Option<BackendError> = None;

        for (idx, endpoint) in self.endpoints.iter().enumerate() {
            match self.try_endpoint(endpoint, query).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() => {
                    log::warn!("[overpass] endpoint {} failed: {}", endpoint, err);
                    last_error = Some(err);
                    if idx + 1 < self.endpoints.len() {
                        tokio::time::sleep(RETRY_BACKOFF).await;
                    }
                }
                Err(err) => {
                    log::warn!("[overpass] endpoint {} rejected the request: {}", endpoint, err);
                    return Err(err);
                }
            }
        }

        Err(BackendError::AllEndpointsFailed {
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no endpoints configured".to_string()),
        })
    }
}

/// Ingestion-boundary validation: hits without coordinates or a usable
/// name are skipped here rather than guarded at every use site.
fn element_to_raw(element: OverpassElement) -> Option<RawResult> {
    let (lat, lon) = match (element.lat, element.lon, &element.center) {
        (Some(lat), Some(lon), _) => (lat, lon),
        (_, _, Some(center)) => (center.lat, center.lon),
        _ => return None,
    };

    let tags = element.tags.unwrap_or_default();
    let name = tags.get("name").map(|n| n.trim().to_string());
    match &name {
        Some(n) if !n.is_empty() => {}
        _ => return None,
    }

    let description = tags.get("description").cloned();
    let thumbnail_url = tags.get("image").cloned();

    Some(RawResult {
        id: element.id.to_string(),
        lat,
        lon,
        tags,
        name,
        description,
        thumbnail_url,
    })
}

impl SearchBackend for OverpassBackend {
    fn search(&self, query: CellQuery) -> BoxFuture<'_, Result<Vec<RawResult>, BackendError>> {
        Box::pin(async move {
            let ql = self.build_query(&query);
            let response = self.post_query(&ql).await?;
            let results: Vec<RawResult> = response
                .elements
                .into_iter()
                .filter_map(element_to_raw)
                .collect();
            log::debug!("[overpass] {} results for cell", results.len());
            Ok(results)
        })
    }
}
