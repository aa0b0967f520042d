//! Search backend capability: one radius or bounding-box query per cell.

pub mod overpass;

use std::collections::HashMap;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::sampler::Cell;

/// One backend query: a sampling cell plus the per-cell result cap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellQuery {
    pub cell: Cell,
    pub limit: usize,
}

/// Backend-native search hit, validated once at the ingestion boundary.
///
/// Missing score-relevant attributes are simply absent from `tags` and
/// contribute nothing downstream. Multiple hits across cells may share an
/// `id`; the merger resolves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Capability consumed by the fetch coordinator.
///
/// Implementations are expected to tolerate being invoked once per cell,
/// with latency up to tens of seconds and occasional rate limiting.
pub trait SearchBackend: Send + Sync {
    fn search(&self, query: CellQuery) -> BoxFuture<'_, Result<Vec<RawResult>, BackendError>>;
}
