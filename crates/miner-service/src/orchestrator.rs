//! Round-based nonce search.
//!
//! Each round covers the window `[S, S + T*C)` split into `T` contiguous
//! sub-ranges of `C` nonces, one per worker. Rounds run strictly one after
//! another; a round without a match advances the window by `T*C`.
//!
//! When two workers match in the same round the larger nonce is reported.
//! Any matching nonce is a valid answer, so this is a convention and not a
//! lowest-nonce guarantee.

use std::time::Instant;

use challenge_core::ChallengeError;
use engine_cpu::{CandidatePredicate, Range};

use crate::pool::{WorkerPool, WorkerResult};
use crate::{format_rate, Solution, SolveError, SolverConfig};

/// Splits `[start, start + workers * chunk_size)` into `workers` consecutive
/// ranges of `chunk_size` nonces each.
///
/// Near the top of the nonce space the window is cut at `u64::MAX`: the last
/// non-empty range is shortened and any workers after it get empty ranges.
/// `u64::MAX` itself is never scanned, since ranges are half-open.
pub fn partition_window(start: u64, workers: usize, chunk_size: u64) -> Result<Vec<Range>, SolveError> {
    if start == u64::MAX {
        return Err(SolveError::NonceSpaceExhausted { start });
    }
    let mut ranges = Vec::with_capacity(workers);
    let mut lo = start;
    for _ in 0..workers {
        let hi = lo.saturating_add(chunk_size);
        ranges.push(Range::new(lo, hi));
        lo = hi;
    }
    Ok(ranges)
}

/// What one round produced, folded over all workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    pub found: Option<u64>,
    pub examined: u64,
}

impl RoundOutcome {
    pub fn aggregate(results: &[WorkerResult]) -> Self {
        Self {
            found: results.iter().filter_map(|r| r.status.found_nonce()).max(),
            examined: results.iter().map(|r| r.status.hash_count()).sum(),
        }
    }
}

/// Keeps the active-jobs gauge at 1 for the lifetime of a search.
struct ActiveJobGuard;

impl ActiveJobGuard {
    fn new() -> Self {
        metrics::set_active_jobs(1);
        Self
    }
}

impl Drop for ActiveJobGuard {
    fn drop(&mut self) {
        metrics::set_active_jobs(0);
    }
}

/// A validated search plan: worker count, window geometry and budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonceSearch {
    workers: usize,
    chunk_size: u64,
    cancel_check_interval: u64,
    max_rounds: Option<u64>,
    start_nonce: u64,
}

impl NonceSearch {
    pub fn new(config: &SolverConfig) -> Result<Self, SolveError> {
        let workers = config.resolve_workers()?;
        if config.chunk_size == 0 {
            return Err(SolveError::ZeroChunk);
        }
        Ok(Self {
            workers,
            chunk_size: config.chunk_size,
            cancel_check_interval: config.cancel_check_interval.max(1),
            max_rounds: config.max_rounds,
            start_nonce: config.resolve_start_nonce(),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn start_nonce(&self) -> u64 {
        self.start_nonce
    }

    /// Runs rounds until a worker matches or the round budget runs out.
    ///
    /// `factory` is called once per worker, with the worker index, before the
    /// first round. Each predicate lives on its worker thread for the whole
    /// search.
    pub fn solve<P, F>(&self, mut factory: F) -> Result<Solution, SolveError>
    where
        P: CandidatePredicate + 'static,
        F: FnMut(usize) -> Result<P, ChallengeError>,
    {
        let predicates = (0..self.workers)
            .map(&mut factory)
            .collect::<Result<Vec<P>, ChallengeError>>()?;
        let name = predicates.first().map_or("unknown", |p| p.name());

        metrics::set_workers(self.workers as i64);
        metrics::set_effective_cpus(num_cpus::get().max(1) as i64);
        metrics::reset_rate();

        log::info!(
            "Searching {} from nonce {} ({} workers x {} nonces per round)",
            name,
            self.start_nonce,
            self.workers,
            self.chunk_size
        );

        let pool = WorkerPool::new(predicates, self.cancel_check_interval);
        let _active = ActiveJobGuard::new();

        let started = Instant::now();
        let mut window_start = self.start_nonce;
        let mut rounds: u64 = 0;
        let mut examined: u64 = 0;

        loop {
            if let Some(limit) = self.max_rounds {
                if rounds >= limit {
                    log::warn!(
                        "Giving up after {} rounds ({} nonces examined)",
                        rounds,
                        examined
                    );
                    return Err(SolveError::BudgetExhausted { rounds, examined });
                }
            }

            let ranges = partition_window(window_start, self.workers, self.chunk_size)?;
            let window_end = ranges.last().map_or(window_start, |r| r.end);

            let round_started = Instant::now();
            let results = pool.run_round(rounds, &ranges)?;
            let outcome = RoundOutcome::aggregate(&results);

            rounds += 1;
            examined += outcome.examined;
            metrics::inc_rounds();
            metrics::record_nonces(outcome.examined);

            if let Some(nonce) = outcome.found {
                metrics::inc_solutions();
                let solution = Solution {
                    nonce,
                    rounds,
                    examined,
                    elapsed: started.elapsed(),
                };
                log::info!(
                    "Found nonce {} for {} after {} rounds, {} nonces in {:.2?} ({})",
                    nonce,
                    name,
                    rounds,
                    examined,
                    solution.elapsed,
                    format_rate(solution.rate())
                );
                return Ok(solution);
            }

            let elapsed = round_started.elapsed();
            let secs = elapsed.as_secs_f64();
            let rate = if secs > 0.0 {
                outcome.examined as f64 / secs
            } else {
                0.0
            };
            log::info!(
                "Round {} [{}, {}): no match, {} nonces in {:.2?} ({})",
                rounds,
                window_start,
                window_end,
                outcome.examined,
                elapsed,
                format_rate(rate)
            );

            window_start = window_end;
        }
    }
}
