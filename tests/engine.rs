//! End-to-end discovery scenarios against a scripted backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use poi_discovery::{
    Category, Cell, CellQuery, DiscoveryEngine, DiscoveryError, EngineConfig, RawResult, Region,
    SamplingStrategy, SearchBackend,
};

type Handler = Box<dyn Fn(CellQuery) -> Vec<RawResult> + Send + Sync>;

/// Backend returning scripted results per cell, with an optional artificial
/// delay and a call counter.
struct ScriptedBackend {
    calls: AtomicUsize,
    delay: Duration,
    handler: Handler,
}

impl ScriptedBackend {
    fn new(delay: Duration, handler: Handler) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
            handler,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SearchBackend for ScriptedBackend {
    fn search(
        &self,
        query: CellQuery,
    ) -> BoxFuture<'_, Result<Vec<RawResult>, poi_discovery::BackendError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok((self.handler)(query))
        })
    }
}

fn raw(id: &str, lat: f64, lon: f64, tags: &[(&str, &str)]) -> RawResult {
    RawResult {
        id: id.to_string(),
        lat,
        lon,
        name: Some(format!("POI {}", id)),
        description: None,
        thumbnail_url: None,
        tags: tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

/// Square region spanning lat 50..52, lon 19..21.
fn square_region(name: &str) -> Region {
    Region::new(
        name,
        vec![vec![vec![
            (50.0, 19.0),
            (50.0, 21.0),
            (52.0, 21.0),
            (52.0, 19.0),
            (50.0, 19.0),
        ]]],
    )
}

fn config_2x2() -> EngineConfig {
    EngineConfig {
        strategy: SamplingStrategy::TileGrid { rows: 2, cols: 2 },
        ..EngineConfig::default()
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn overlapping_tiles_deduplicate_and_clip() {
    init_logger();

    // Point "A" appears in two tiles at different signal richness; point
    // "B" is inside the bounding box but outside the polygon.
    let handler: Handler = Box::new(|query| {
        let corner = match query.cell {
            Cell::Rect { south, west, .. } => (south, west),
            _ => panic!("tile grid expected"),
        };
        match corner {
            (s, w) if s == 50.0 && w == 19.0 => {
                vec![raw("A", 50.5, 19.5, &[("historic", "castle")])]
            }
            (s, w) if s == 50.0 && w == 20.0 => vec![raw(
                "A",
                50.5,
                19.5,
                &[("historic", "castle"), ("wikipedia", "pl:Zamek")],
            )],
            _ => vec![raw("B", 55.0, 19.5, &[("historic", "ruins")])],
        }
    });

    let backend = Arc::new(ScriptedBackend::new(Duration::ZERO, handler));
    let engine = DiscoveryEngine::new(backend.clone(), config_2x2());
    let region = square_region("Malopolskie");

    let points = engine.discover(&region).await.unwrap();
    assert_eq!(backend.calls(), 4);
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].id, "A");
    assert_eq!(points[0].score, 5);
    assert_eq!(points[0].category, Category::Landmark);
}

#[tokio::test]
async fn cache_hit_issues_no_backend_calls() {
    init_logger();

    let handler: Handler = Box::new(|_| {
        vec![
            raw("k1", 50.5, 19.5, &[("amenity", "place_of_worship")]),
            raw("z1", 51.0, 20.0, &[("historic", "castle")]),
        ]
    });
    let backend = Arc::new(ScriptedBackend::new(Duration::ZERO, handler));
    let engine = DiscoveryEngine::new(backend.clone(), config_2x2());
    let region = square_region("Podlaskie");

    let first = engine.discover(&region).await.unwrap();
    let calls_after_first = backend.calls();
    assert_eq!(calls_after_first, 4);
    assert!(!first.is_empty());

    // A different category filter re-derives the view from the cache.
    let churches = engine
        .view(&region.key, &[Category::Church], 10)
        .unwrap();
    assert_eq!(churches.len(), 1);
    assert_eq!(churches[0].id, "k1");

    let landmarks = engine
        .view(&region.key, &[Category::Landmark], 10)
        .unwrap();
    assert_eq!(landmarks.len(), 1);

    // A second discovery run reuses the entry outright.
    let second = engine.discover(&region).await.unwrap();
    assert_eq!(backend.calls(), calls_after_first);
    assert_eq!(second.len(), first.len());
    assert!(!engine.is_loading());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_leaves_no_cache_entry() {
    init_logger();

    let handler: Handler =
        Box::new(|_| vec![raw("slow", 50.5, 19.5, &[("historic", "castle")])]);
    let backend = Arc::new(ScriptedBackend::new(Duration::from_millis(80), handler));
    let engine = Arc::new(DiscoveryEngine::new(
        backend.clone(),
        EngineConfig {
            strategy: SamplingStrategy::TileGrid { rows: 2, cols: 2 },
            concurrency: 1,
            ..EngineConfig::default()
        },
    ));
    let region = square_region("Lubuskie");

    let task = {
        let engine = engine.clone();
        let region = region.clone();
        tokio::spawn(async move { engine.discover(&region).await })
    };

    // Let the first cell start, then switch away.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(engine.is_loading());
    engine.cancel_active();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(DiscoveryError::Cancelled)));
    assert!(!engine.cache().contains(&region.key));
    assert!(engine.view(&region.key, &Category::ALL, 10).is_none());
    assert!(!engine.is_loading());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn loading_signal_tracks_the_fetch_batch() {
    init_logger();

    let handler: Handler =
        Box::new(|_| vec![raw("p", 50.5, 19.5, &[("tourism", "museum")])]);
    let backend = Arc::new(ScriptedBackend::new(Duration::from_millis(40), handler));
    let engine = Arc::new(DiscoveryEngine::new(backend, config_2x2()));
    let mut loading = engine.subscribe_loading();
    assert!(!*loading.borrow());

    let region = square_region("Opolskie");
    let task = {
        let engine = engine.clone();
        let region = region.clone();
        tokio::spawn(async move { engine.discover(&region).await })
    };

    loading.changed().await.unwrap();
    assert!(*loading.borrow());

    task.await.unwrap().unwrap();
    assert!(!engine.is_loading());
}

#[tokio::test]
async fn progress_events_cover_every_cell() {
    init_logger();

    let handler: Handler =
        Box::new(|_| vec![raw("p", 50.5, 19.5, &[("tourism", "attraction")])]);
    let backend = Arc::new(ScriptedBackend::new(Duration::ZERO, handler));
    let engine = DiscoveryEngine::new(backend, config_2x2());
    let (tx, mut rx) = mpsc::channel(16);
    engine.set_progress_sender(tx);

    let region = square_region("Pomorskie");
    engine.discover(&region).await.unwrap();
    drop(engine);

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    let last = last.expect("no progress events");
    assert_eq!(last.total, 4);
    assert_eq!(last.completed + last.failed, 4);
}

#[tokio::test]
async fn degenerate_region_yields_an_empty_result() {
    init_logger();

    let handler: Handler = Box::new(|_| vec![]);
    let backend = Arc::new(ScriptedBackend::new(Duration::ZERO, handler));
    let engine = DiscoveryEngine::new(backend.clone(), config_2x2());

    let empty = Region::new("Nigdzie", vec![]);
    let points = engine.discover(&empty).await.unwrap();
    assert!(points.is_empty());
    assert_eq!(backend.calls(), 0);
    assert!(!engine.is_loading());
}

#[tokio::test]
async fn unclassifiable_results_never_reach_the_view() {
    init_logger();

    let handler: Handler = Box::new(|_| {
        vec![
            raw("shop", 50.5, 19.5, &[("shop", "bakery")]),
            raw("peak", 51.0, 20.0, &[("natural", "peak")]),
        ]
    });
    let backend = Arc::new(ScriptedBackend::new(Duration::ZERO, handler));
    let engine = DiscoveryEngine::new(backend, config_2x2());
    let region = square_region("Podkarpackie");

    let points = engine.discover(&region).await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].category, Category::Mountain);

    let view = engine.view(&region.key, &Category::ALL, 50).unwrap();
    assert_eq!(view.len(), 1);
}
