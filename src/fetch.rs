//! Fetch coordinator: bounded-concurrency fan-out of one backend query per
//! cell, with cooperative cancellation and per-cell failure tolerance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::{CellQuery, RawResult, SearchBackend};
use crate::error::BackendError;
use crate::sampler::Cell;
use crate::types::ProgressEvent;

/// Shared cancellation signal for one discovery run.
///
/// Checked by every worker before dispatching a cell and again after each
/// network call returns, so late results from a cancelled run are dropped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything a fetch batch produced: accumulated raw results plus the
/// failures of individual cells. A cell failure never fails the batch.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub results: Vec<RawResult>,
    pub errors: Vec<BackendError>,
}

/// Issue one backend query per cell through a fixed-size worker pool.
///
/// Workers pull cells from a shared queue until it is drained or the token
/// is cancelled; each failed cell is logged and collected, not propagated.
/// Progress events (one per attempted cell) go to `progress` when provided;
/// send failures are ignored.
pub async fn fetch_all(
    backend: Arc<dyn SearchBackend>,
    cells: Vec<Cell>,
    per_cell_limit: usize,
    concurrency: usize,
    cancel: CancelToken,
    progress: Option<mpsc::Sender<ProgressEvent>>,
) -> FetchOutcome {
    let total = cells.len() as u64;
    if cells.is_empty() {
        return FetchOutcome::default();
    }

    let workers = concurrency.max(1);
    let (cell_tx, cell_rx) = async_channel::unbounded::<(usize, Cell)>();
    for entry in cells.into_iter().enumerate() {
        let _ = cell_tx.try_send(entry);
    }
    cell_tx.close();

    let (result_tx, mut result_rx) =
        mpsc::channel::<(usize, Result<Vec<RawResult>, BackendError>)>(workers);

    let handles: Vec<_> = (0..workers)
        .map(|worker_id| {
            let backend = backend.clone();
            let cell_rx = cell_rx.clone();
            let result_tx = result_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                while let Ok((idx, cell)) = cell_rx.recv().await {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let outcome = backend
                        .search(CellQuery {
                            cell,
                            limit: per_cell_limit,
                        })
                        .await;
                    if cancel.is_cancelled() {
                        // Late arrival from a cancelled run: discard.
                        break;
                    }
                    if result_tx.send((idx, outcome)).await.is_err() {
                        break;
                    }
                }
                log::debug!("[fetch] worker {} done", worker_id);
            })
        })
        .collect();
    drop(result_tx);
    drop(cell_rx);

    let mut outcome = FetchOutcome::default();
    let mut completed = 0u64;
    let mut failed = 0u64;
    while let Some((idx, result)) = result_rx.recv().await {
        match result {
            Ok(raws) => {
                completed += 1;
                outcome.results.extend(raws);
            }
            Err(err) => {
                failed += 1;
                log::warn!("[fetch] cell {} failed: {}", idx, err);
                outcome.errors.push(err);
            }
        }
        if let Some(tx) = &progress {
            let _ = tx
                .send(ProgressEvent {
                    completed,
                    failed,
                    total,
                })
                .await;
        }
    }

    futures::future::join_all(handles).await;

    log::info!(
        "[fetch] batch finished: {} ok, {} failed of {} cells",
        completed,
        failed,
        total
    );
    outcome
}
