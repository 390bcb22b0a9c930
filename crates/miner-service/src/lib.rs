//! Parallel nonce search over witness challenges.
//!
//! This crate provides:
//! - `SolverConfig`, built once by the caller and passed down
//! - a persistent worker pool that owns one predicate per thread
//! - the round-based orchestrator (`NonceSearch`)
//! - the two public entry points, `solve_sorted_sequence` and
//!   `solve_shortest_path`, plus `run_self_tests`

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod orchestrator;
pub mod pool;
pub mod self_test;

use std::fmt;
use std::time::Duration;

use challenge_core::{ChallengeError, HexPrefix, ShortestPathParams, SortOrder, SortedListParams};
use engine_cpu::{ShortestPathPredicate, SortedListPredicate, DEFAULT_CANCEL_CHECK_INTERVAL};
use rand::Rng;

pub use orchestrator::{partition_window, NonceSearch, RoundOutcome};
pub use pool::{RoundJob, WorkerPool, WorkerResult};
pub use self_test::{run_self_tests, SelfTestCheck, SelfTestReport};

/// Nonces handed to each worker per round.
pub const DEFAULT_CHUNK_SIZE: u64 = 10_000;

/// Random starting nonces are drawn from `[0, RANDOM_START_LIMIT)`.
pub const RANDOM_START_LIMIT: u64 = 100_000_000;

/// Solver runtime configuration provided by the CLI or library caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    /// Number of worker threads (None = one per logical CPU).
    pub workers: Option<usize>,
    /// Nonces per worker per round.
    pub chunk_size: u64,
    /// Nonces scanned between two reads of the cancellation flag.
    pub cancel_check_interval: u64,
    /// Give up after this many rounds (None = search until found).
    pub max_rounds: Option<u64>,
    /// First nonce of the first round (None = random).
    pub start_nonce: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            workers: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel_check_interval: DEFAULT_CANCEL_CHECK_INTERVAL,
            max_rounds: None,
            start_nonce: None,
        }
    }
}

impl SolverConfig {
    /// Worker count after auto-detection. `Some(0)` is rejected.
    pub fn resolve_workers(&self) -> Result<usize, SolveError> {
        match self.workers {
            Some(0) => Err(SolveError::NoWorkers),
            Some(n) => Ok(n),
            None => {
                let detected = num_cpus::get().max(1);
                log::info!("Auto-detected {} worker threads", detected);
                Ok(detected)
            }
        }
    }

    pub fn resolve_start_nonce(&self) -> u64 {
        self.start_nonce
            .unwrap_or_else(|| rand::thread_rng().gen_range(0..RANDOM_START_LIMIT))
    }
}

impl fmt::Display for SolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.workers {
            Some(n) => write!(f, "workers={n}")?,
            None => write!(f, "workers=auto")?,
        }
        write!(
            f,
            " chunk_size={} cancel_check_interval={}",
            self.chunk_size, self.cancel_check_interval
        )?;
        match self.max_rounds {
            Some(n) => write!(f, " max_rounds={n}")?,
            None => write!(f, " max_rounds=unbounded")?,
        }
        match self.start_nonce {
            Some(n) => write!(f, " start_nonce={n}"),
            None => write!(f, " start_nonce=random"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error(transparent)]
    Config(#[from] ChallengeError),
    #[error("at least one worker thread is required")]
    NoWorkers,
    #[error("chunk size must be greater than zero")]
    ZeroChunk,
    #[error("no match after {rounds} rounds ({examined} nonces examined)")]
    BudgetExhausted { rounds: u64, examined: u64 },
    /// Every nonce below `u64::MAX` has been scanned without a match.
    #[error("nonce space exhausted at {start} without a match")]
    NonceSpaceExhausted { start: u64 },
    #[error("a worker thread stopped unexpectedly")]
    WorkerDisconnected,
}

/// A matching nonce plus the work it took to find it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    pub rounds: u64,
    /// Nonces tested across all workers, including the ones after the match
    /// that other workers scanned before seeing the cancellation flag.
    pub examined: u64,
    pub elapsed: Duration,
}

impl Solution {
    /// Nonces per second over the whole search.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.examined as f64 / secs
        } else {
            0.0
        }
    }
}

/// Human-readable nonce rate, e.g. `12.34K N/s`.
pub fn format_rate(rate: f64) -> String {
    if rate >= 1_000_000.0 {
        format!("{:.2}M N/s", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.2}K N/s", rate / 1_000.0)
    } else {
        format!("{:.0} N/s", rate)
    }
}

/// Finds a nonce whose sorted-list witness hashes to `target_prefix`.
pub fn solve_sorted_sequence(
    config: &SolverConfig,
    target_prefix: &str,
    previous_hash: &str,
    nb_elements: usize,
    ascending: bool,
) -> Result<Solution, SolveError> {
    let prefix = HexPrefix::new(target_prefix)?;
    let params = SortedListParams::new(nb_elements, SortOrder::from_ascending(ascending))?;
    let search = NonceSearch::new(config)?;

    log::info!(
        "Solving {} (elements={}, prefix={:?}, {})",
        params.kind(),
        nb_elements,
        prefix.as_str(),
        config
    );

    search.solve(|_| Ok(SortedListPredicate::new(previous_hash, prefix.clone(), params)))
}

/// Finds a nonce whose verified shortest path hashes to `target_prefix`.
pub fn solve_shortest_path(
    config: &SolverConfig,
    target_prefix: &str,
    previous_hash: &str,
    nb_blockers: usize,
    grid_size: usize,
) -> Result<Solution, SolveError> {
    let prefix = HexPrefix::new(target_prefix)?;
    let params = ShortestPathParams::new(grid_size, nb_blockers)?;
    let search = NonceSearch::new(config)?;

    log::info!(
        "Solving shortest_path (grid={}, blockers={}, prefix={:?}, {})",
        grid_size,
        nb_blockers,
        prefix.as_str(),
        config
    );

    search.solve(|_| ShortestPathPredicate::new(previous_hash, prefix.clone(), params))
}
