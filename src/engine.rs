//! Discovery engine: orchestrates sampling, fetching, merging, caching, and
//! view derivation for the currently selected region.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::backend::SearchBackend;
use crate::cache::RegionCache;
use crate::config::EngineConfig;
use crate::error::DiscoveryError;
use crate::fetch::{self, CancelToken};
use crate::filter;
use crate::merge::{self, ClassifierRules};
use crate::region::Region;
use crate::sampler;
use crate::types::{Category, ClassifiedPoint, ProgressEvent};

/// One engine per backend; holds the region cache for the process session.
///
/// Concurrent `discover` calls are serialized by run generation: starting a
/// new run (or calling [`DiscoveryEngine::cancel_active`]) supersedes the
/// previous one, whose late results are discarded without a cache write.
pub struct DiscoveryEngine {
    backend: Arc<dyn SearchBackend>,
    cache: RegionCache,
    config: EngineConfig,
    rules: ClassifierRules,
    generation: AtomicU64,
    active_cancel: Mutex<Option<CancelToken>>,
    loading_tx: watch::Sender<bool>,
    progress_tx: Mutex<Option<mpsc::Sender<ProgressEvent>>>,
}

impl DiscoveryEngine {
    pub fn new(backend: Arc<dyn SearchBackend>, config: EngineConfig) -> Self {
        let (loading_tx, _) = watch::channel(false);
        Self {
            backend,
            cache: RegionCache::new(),
            config,
            rules: ClassifierRules::default(),
            generation: AtomicU64::new(0),
            active_cancel: Mutex::new(None),
            loading_tx,
            progress_tx: Mutex::new(None),
        }
    }

    /// Replace the default (Polish-locale) classification rule table.
    pub fn with_rules(mut self, rules: ClassifierRules) -> Self {
        self.rules = rules;
        self
    }

    /// Receive per-cell progress events for subsequent discovery runs.
    pub fn set_progress_sender(&self, sender: mpsc::Sender<ProgressEvent>) {
        *self.progress_tx.lock() = Some(sender);
    }

    /// True from the start of a fetch batch (cache miss) until the batch
    /// completes or is cancelled; false on a cache hit.
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading_tx.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading_tx.borrow()
    }

    pub fn cache(&self) -> &RegionCache {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cancel the in-flight discovery run, if any. Called when the region
    /// selection changes or the engine is torn down.
    pub fn cancel_active(&self) {
        if let Some(token) = self.active_cancel.lock().take() {
            token.cancel();
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.loading_tx.send(false);
    }

    /// Discover POIs for a region, reusing the cache when possible.
    ///
    /// A cache hit returns immediately and issues no backend calls. On a
    /// miss, the region is sampled into cells, fetched, merged, and the
    /// unfiltered result written to the cache once, unless the run was
    /// superseded or cancelled in the meantime.
    pub async fn discover(
        &self,
        region: &Region,
    ) -> Result<Arc<[ClassifiedPoint]>, DiscoveryError> {
        if let Some(entry) = self.cache.get(&region.key) {
            log::info!("[engine] cache hit for region {}", region.key);
            return Ok(entry);
        }

        let cells = sampler::sample_cells(region.bbox, &region.polygons, self.config.strategy);
        if cells.is_empty() {
            log::warn!("[engine] region {} produced no cells", region.key);
            return Ok(Arc::from(Vec::new()));
        }
        let cell_count = cells.len();

        let cancel = CancelToken::new();
        {
            let mut active = self.active_cancel.lock();
            if let Some(previous) = active.take() {
                previous.cancel();
            }
            *active = Some(cancel.clone());
        }
        let run_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.loading_tx.send(true);
        log::info!(
            "[engine] discovering region {} with {} cells",
            region.key,
            cell_count
        );

        let progress = self.progress_tx.lock().clone();
        let outcome = fetch::fetch_all(
            self.backend.clone(),
            cells,
            self.config.per_cell_limit,
            self.config.concurrency,
            cancel.clone(),
            progress,
        )
        .await;

        let still_current = self.generation.load(Ordering::SeqCst) == run_generation;
        if cancel.is_cancelled() || !still_current {
            log::info!("[engine] run for region {} superseded, discarding", region.key);
            if still_current {
                let _ = self.loading_tx.send(false);
            }
            return Err(DiscoveryError::Cancelled);
        }

        if !outcome.errors.is_empty() {
            log::warn!(
                "[engine] region {}: {} of {} cells failed",
                region.key,
                outcome.errors.len(),
                cell_count
            );
        }

        let all_cells_failed = outcome.errors.len() == cell_count;
        let points = merge::merge(outcome.results, &region.polygons, &self.rules);

        let entry = if points.is_empty() && all_cells_failed {
            // Nothing usable arrived: return empty without caching so a
            // later attempt can still succeed.
            Arc::from(Vec::new())
        } else {
            self.cache.insert_if_absent(&region.key, points)
        };

        *self.active_cancel.lock() = None;
        let _ = self.loading_tx.send(false);
        Ok(entry)
    }

    /// Derive the displayed list for a previously discovered region.
    /// `None` when the region has no cache entry yet.
    pub fn view(
        &self,
        region_key: &str,
        active: &[Category],
        per_category_cap: usize,
    ) -> Option<Vec<ClassifiedPoint>> {
        self.cache
            .get(region_key)
            .map(|points| filter::filter_and_limit(&points, active, per_category_cap))
    }

    /// Drop a region's cache entry, e.g. after its geometry changed.
    pub fn invalidate(&self, region_key: &str) -> bool {
        self.cache.invalidate(region_key)
    }
}
