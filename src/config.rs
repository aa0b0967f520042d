//! Engine configuration, loadable from a JSON file with sensible defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::overpass::DEFAULT_ENDPOINTS;
use crate::sampler::SamplingStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker count of the fetch pool.
    pub concurrency: usize,
    /// Cell shape, chosen by the backend's query shape.
    pub strategy: SamplingStrategy,
    /// Result cap per cell query.
    pub per_cell_limit: usize,
    /// Display cap per category after filtering.
    pub per_category_cap: usize,
    /// Per-request timeout, seconds.
    pub request_timeout_secs: u64,
    /// Backend endpoints, in fallback priority order.
    pub endpoints: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            strategy: SamplingStrategy::default(),
            per_cell_limit: 60,
            per_category_cap: 50,
            request_timeout_secs: 20,
            endpoints: DEFAULT_ENDPOINTS.clone(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            Ok(Self::default())
        }
    }
}
