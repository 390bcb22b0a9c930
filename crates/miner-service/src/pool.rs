//! Persistent worker pool.
//!
//! Each worker thread owns one predicate for the whole search, so generator
//! state, grids and path buffers are allocated once per worker and reused for
//! every nonce of every round. The only state shared between workers is the
//! cancellation flag.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use engine_cpu::{search_range, CandidatePredicate, EngineStatus, Range};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::SolveError;

/// How long `run_round` waits for a result before checking for dead workers.
const LIVENESS_POLL: Duration = Duration::from_millis(100);

/// A sub-range to scan, tagged with the round it belongs to.
#[derive(Clone, Copy, Debug)]
pub struct RoundJob {
    pub round: u64,
    pub range: Range,
}

/// Result from a single worker thread for one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerResult {
    pub worker_id: usize,
    pub round: u64,
    pub range: Range,
    pub status: EngineStatus,
}

pub struct WorkerPool {
    /// One job channel per worker.
    job_senders: Vec<Sender<RoundJob>>,
    /// Results from all workers.
    result_rx: Receiver<WorkerResult>,
    /// Shared cancellation flag for all workers.
    cancel_flag: Arc<AtomicBool>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns one worker per predicate.
    pub fn new<P>(predicates: Vec<P>, cancel_check_interval: u64) -> Self
    where
        P: CandidatePredicate + 'static,
    {
        let workers = predicates.len();
        let (result_tx, result_rx) = bounded(workers.max(1) * 2);
        let cancel_flag = Arc::new(AtomicBool::new(false));

        let mut job_senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        log::info!("Creating worker pool: {} workers", workers);

        for (worker_id, predicate) in predicates.into_iter().enumerate() {
            let (job_tx, job_rx) = bounded::<RoundJob>(1);
            job_senders.push(job_tx);

            let tx = result_tx.clone();
            let cancel = cancel_flag.clone();
            let handle = thread::Builder::new()
                .name(format!("miner-worker-{worker_id}"))
                .spawn(move || {
                    worker_loop(
                        worker_id,
                        predicate,
                        job_rx,
                        tx,
                        cancel,
                        cancel_check_interval,
                    );
                });
            match handle {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // The job sender is dropped with this worker; `run_round`
                    // reports the pool as disconnected.
                    log::error!("failed to spawn worker {}: {}", worker_id, e);
                }
            }
        }

        Self {
            job_senders,
            result_rx,
            cancel_flag,
            handles,
        }
    }

    /// Dispatches one range per worker and blocks until every worker reports.
    ///
    /// Results are returned ordered by worker id. `ranges` must hold exactly
    /// one range per worker.
    pub fn run_round(&self, round: u64, ranges: &[Range]) -> Result<Vec<WorkerResult>, SolveError> {
        debug_assert_eq!(ranges.len(), self.job_senders.len());
        if self.handles.len() != self.job_senders.len() {
            return Err(SolveError::WorkerDisconnected);
        }

        self.cancel_flag.store(false, Ordering::SeqCst);

        for (tx, &range) in self.job_senders.iter().zip(ranges) {
            tx.send(RoundJob { round, range })
                .map_err(|_| SolveError::WorkerDisconnected)?;
        }
        log::debug!(
            "Round {} dispatched to {} workers",
            round,
            self.job_senders.len()
        );

        let mut results = Vec::with_capacity(ranges.len());
        while results.len() < ranges.len() {
            match self.result_rx.recv_timeout(LIVENESS_POLL) {
                Ok(result) if result.round == round => results.push(result),
                Ok(stale) => {
                    log::debug!(
                        "discarding stale result from worker {} (round {} != {})",
                        stale.worker_id,
                        stale.round,
                        round
                    );
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.handles.iter().any(|h| h.is_finished()) {
                        return Err(SolveError::WorkerDisconnected);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SolveError::WorkerDisconnected)
                }
            }
        }

        results.sort_by_key(|r| r.worker_id);
        Ok(results)
    }

    /// Ask running workers to stop at their next check.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    pub fn cancel_flag(&self) -> &Arc<AtomicBool> {
        &self.cancel_flag
    }

    pub fn worker_count(&self) -> usize {
        self.job_senders.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.cancel();
        // Closing the job channels ends each worker loop.
        self.job_senders.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Main loop for a persistent worker thread.
fn worker_loop<P: CandidatePredicate>(
    worker_id: usize,
    mut predicate: P,
    job_rx: Receiver<RoundJob>,
    result_tx: Sender<WorkerResult>,
    cancel_flag: Arc<AtomicBool>,
    cancel_check_interval: u64,
) {
    log::debug!("worker {} started ({})", worker_id, predicate.name());

    while let Ok(job) = job_rx.recv() {
        let status = search_range(&mut predicate, job.range, &cancel_flag, cancel_check_interval);

        match status {
            EngineStatus::Found { nonce, hash_count } => {
                let hash = predicate
                    .witness_digest(nonce)
                    .map(hex::encode)
                    .unwrap_or_default();
                log::info!(
                    "worker {} found nonce {} after {} attempts (round {}), hash {}",
                    worker_id,
                    nonce,
                    hash_count,
                    job.round,
                    hash
                );
            }
            EngineStatus::Exhausted { hash_count } => log::debug!(
                "worker {} exhausted [{}, {}) ({} attempts)",
                worker_id,
                job.range.start,
                job.range.end,
                hash_count
            ),
            EngineStatus::Cancelled { hash_count } => log::debug!(
                "worker {} cancelled ({} attempts)",
                worker_id,
                hash_count
            ),
        }

        let result = WorkerResult {
            worker_id,
            round: job.round,
            range: job.range,
            status,
        };
        if result_tx.send(result).is_err() {
            break;
        }
    }

    log::debug!("worker {} exited", worker_id);
}
