#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! CPU search engine: candidate predicates and the range scan that drives them.
//!
//! A `CandidatePredicate` answers one question for one nonce: does the witness
//! derived from `(previous_hash, nonce)` hash to the target prefix? Each
//! predicate owns its generator, grid and path buffers, so one instance per
//! worker thread runs without any shared state.
//!
//! `search_range` scans a half-open nonce range in ascending order and checks
//! the shared cancellation flag once every `check_interval` nonces. A worker can
//! therefore overshoot a cancellation by at most one interval.

pub mod shortest_path;
pub mod sorted_list;

use std::sync::atomic::{AtomicBool, Ordering};

use challenge_core::{Digest, HexPrefix};

pub use shortest_path::{write_path, ShortestPathPredicate};
pub use sorted_list::SortedListPredicate;

/// Nonces scanned between two reads of the cancellation flag. Trades
/// cancellation latency against flag traffic; results do not depend on it.
pub const DEFAULT_CANCEL_CHECK_INTERVAL: u64 = 64;

/// Per-nonce test for one challenge instance.
pub trait CandidatePredicate: Send {
    /// Human-readable predicate name (for logs/metrics).
    fn name(&self) -> &'static str;

    fn prefix(&self) -> &HexPrefix;

    /// Digest of the canonical witness for `nonce`, or `None` when this nonce
    /// has no acceptable witness (unreachable goal, verifier mismatch).
    fn witness_digest(&mut self, nonce: u64) -> Option<Digest>;

    fn test(&mut self, nonce: u64) -> bool {
        match self.witness_digest(nonce) {
            Some(digest) => self.prefix().matches_digest(&digest),
            None => false,
        }
    }
}

impl<P: CandidatePredicate + ?Sized> CandidatePredicate for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn prefix(&self) -> &HexPrefix {
        (**self).prefix()
    }

    fn witness_digest(&mut self, nonce: u64) -> Option<Digest> {
        (**self).witness_digest(nonce)
    }

    fn test(&mut self, nonce: u64) -> bool {
        (**self).test(nonce)
    }
}

/// A half-open nonce range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Range {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Outcome of scanning one range. `hash_count` is the number of nonces tested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineStatus {
    Found { nonce: u64, hash_count: u64 },
    Exhausted { hash_count: u64 },
    Cancelled { hash_count: u64 },
}

impl EngineStatus {
    pub fn hash_count(&self) -> u64 {
        match *self {
            EngineStatus::Found { hash_count, .. }
            | EngineStatus::Exhausted { hash_count }
            | EngineStatus::Cancelled { hash_count } => hash_count,
        }
    }

    pub fn found_nonce(&self) -> Option<u64> {
        match *self {
            EngineStatus::Found { nonce, .. } => Some(nonce),
            _ => None,
        }
    }
}

/// Scans `range` with `predicate`.
///
/// On a match the shared `cancel` flag is raised so sibling workers stop at
/// their next check, and `Found` is returned. A flag raised by someone else
/// yields `Cancelled` with the number of nonces tested so far.
pub fn search_range<P>(
    predicate: &mut P,
    range: Range,
    cancel: &AtomicBool,
    check_interval: u64,
) -> EngineStatus
where
    P: CandidatePredicate + ?Sized,
{
    let interval = check_interval.max(1);
    let mut hash_count: u64 = 0;
    let mut nonce = range.start;

    while nonce < range.end {
        if hash_count % interval == 0 && cancel.load(Ordering::Relaxed) {
            return EngineStatus::Cancelled { hash_count };
        }

        hash_count += 1;
        if predicate.test(nonce) {
            cancel.store(true, Ordering::Release);
            return EngineStatus::Found { nonce, hash_count };
        }
        nonce += 1;
    }

    EngineStatus::Exhausted { hash_count }
}
