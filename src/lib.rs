//! Region-scoped POI discovery.
//!
//! Decomposes an arbitrary polygonal region into backend-shaped sampling
//! cells, fans out one search request per cell with bounded concurrency,
//! then clips, deduplicates, scores, and classifies the combined results
//! into a per-region cache that category-filter changes re-read without
//! network traffic.

pub mod backend;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod geometry;
pub mod merge;
pub mod region;
pub mod sampler;
pub mod types;

pub use backend::overpass::OverpassBackend;
pub use backend::{CellQuery, RawResult, SearchBackend};
pub use cache::RegionCache;
pub use config::EngineConfig;
pub use engine::DiscoveryEngine;
pub use error::{BackendError, DiscoveryError};
pub use fetch::{fetch_all, CancelToken, FetchOutcome};
pub use filter::filter_and_limit;
pub use merge::{merge, score_tags, ClassifierRules, TagRule};
pub use region::{regions_from_geojson, Region};
pub use sampler::{sample_cells, Cell, SamplingStrategy};
pub use types::{Category, ClassifiedPoint, ProgressEvent};
