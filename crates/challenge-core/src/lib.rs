#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Primitives shared by every witness challenge.
//!
//! This crate provides:
//! - `sha256` / `sha256_hex`: the hash every witness is judged by
//! - Seed derivation from `(previous_hash, nonce)`, reusing its scratch buffer
//!   so the per-nonce path does not allocate
//! - `ChallengeRng`: the 64-bit Mersenne Twister the challenge generator uses
//! - `HexPrefix`: a validated target prefix, compared case-sensitively
//! - Parameter types for the sorted-list and shortest-path challenges

use core::fmt;
use core::str::FromStr;
use std::fmt::Write as _;

use rand_mt::Mt64;
use sha2::{Digest as _, Sha256};

/// Raw SHA-256 output.
pub type Digest = [u8; 32];

/// Length of a hex-encoded digest.
pub const HASH_HEX_LEN: usize = 64;

/// Smallest grid whose interior has room for distinct start and end cells.
pub const MIN_GRID_SIZE: usize = 4;

/// Largest grid the 16-bit-per-axis position packing can address.
pub const MAX_GRID_SIZE: usize = 0xFFFF;

/// Largest sorted-list witness accepted. Each worker keeps the values and
/// their decimal text (up to 20 bytes per value) in memory.
pub const MAX_SORTED_ELEMENTS: usize = 1 << 20;

/// Caller-contract violations. Everything else in the search is a "no match".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChallengeError {
    #[error("grid size {0} cannot hold distinct start and end cells (minimum is 4)")]
    GridTooSmall(usize),
    #[error("grid size {0} exceeds the position encoding limit of 65535")]
    GridTooLarge(usize),
    #[error("a sorted-list witness needs at least one element")]
    TooFewElements,
    #[error("a sorted-list witness holds at most 1048576 elements, got {0}")]
    TooManyElements(usize),
    #[error("prefix has {0} characters but a digest only has 64")]
    PrefixTooLong(usize),
    #[error("prefix {0:?} contains non-hex characters")]
    InvalidPrefix(String),
    #[error("{0:?} is not a hex digest")]
    InvalidHash(String),
    #[error("unknown challenge kind {0:?}")]
    UnknownChallenge(String),
}

/// SHA-256 over `data`.
pub fn sha256(data: &[u8]) -> Digest {
    Sha256::digest(data).into()
}

/// Lowercase hex SHA-256 over `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// The generator seed carried by a digest: its first 8 bytes read little-endian.
pub fn seed_from_digest(digest: &Digest) -> u64 {
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

/// Same as [`seed_from_digest`] for a hex digest: the first 16 hex characters
/// parsed big-endian, then byte-swapped.
pub fn seed_from_hash(hash_hex: &str) -> Result<u64, ChallengeError> {
    let invalid = || ChallengeError::InvalidHash(hash_hex.to_string());
    let head = hash_hex.get(..16).ok_or_else(invalid)?;
    if !head.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let big_endian = u64::from_str_radix(head, 16).map_err(|_| invalid())?;
    Ok(big_endian.swap_bytes())
}

/// Derives per-nonce seeds for a fixed previous hash.
///
/// Holds the `previous_hash` text and appends the decimal nonce in place, so
/// repeated derivations only touch an already-allocated buffer.
#[derive(Clone, Debug)]
pub struct SeedDeriver {
    buffer: String,
    prefix_len: usize,
}

impl SeedDeriver {
    pub fn new(previous_hash: &str) -> Self {
        let mut buffer = String::with_capacity(previous_hash.len() + 20);
        buffer.push_str(previous_hash);
        Self {
            buffer,
            prefix_len: previous_hash.len(),
        }
    }

    /// Seed for `nonce`: `seed_from_digest(sha256(previous_hash ++ decimal(nonce)))`.
    pub fn derive(&mut self, nonce: u64) -> u64 {
        self.buffer.truncate(self.prefix_len);
        // Writing into a String cannot fail.
        let _ = write!(self.buffer, "{nonce}");
        seed_from_digest(&sha256(self.buffer.as_bytes()))
    }
}

/// One-shot seed derivation.
pub fn derive_seed(previous_hash: &str, nonce: u64) -> u64 {
    SeedDeriver::new(previous_hash).derive(nonce)
}

/// The challenge generator: MT19937-64 seeded with a single 64-bit word.
///
/// Reseeding rebuilds the state in place; the state lives inline, so a worker
/// can keep one generator for its whole range.
#[derive(Clone)]
pub struct ChallengeRng {
    inner: Mt64,
}

impl ChallengeRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Mt64::new(seed),
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.inner = Mt64::new(seed);
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Next draw reduced modulo `bound` (the generator's own convention, not
    /// a bias-free range sample).
    #[inline]
    pub fn next_below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

impl fmt::Debug for ChallengeRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeRng").finish_non_exhaustive()
    }
}

/// A validated target prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HexPrefix {
    text: String,
}

impl HexPrefix {
    pub fn new(prefix: &str) -> Result<Self, ChallengeError> {
        if prefix.len() > HASH_HEX_LEN {
            return Err(ChallengeError::PrefixTooLong(prefix.len()));
        }
        if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ChallengeError::InvalidPrefix(prefix.to_string()));
        }
        Ok(Self {
            text: prefix.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether the lowercase hex rendering of `digest` starts with this prefix.
    /// Only the bytes covering the prefix are encoded.
    pub fn matches_digest(&self, digest: &Digest) -> bool {
        let wanted = self.text.as_bytes();
        let bytes = (wanted.len() + 1) / 2;
        let mut buf = [0u8; HASH_HEX_LEN];
        if hex::encode_to_slice(&digest[..bytes], &mut buf[..bytes * 2]).is_err() {
            return false;
        }
        &buf[..wanted.len()] == wanted
    }

    pub fn matches_hex(&self, hash_hex: &str) -> bool {
        hash_hex.starts_with(self.text.as_str())
    }
}

impl FromStr for HexPrefix {
    type Err = ChallengeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for HexPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Challenge kinds, named as the coin server names them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChallengeKind {
    SortedList,
    ReverseSortedList,
    ShortestPath,
}

impl ChallengeKind {
    pub fn name(self) -> &'static str {
        match self {
            ChallengeKind::SortedList => "sorted_list",
            ChallengeKind::ReverseSortedList => "reverse_sorted_list",
            ChallengeKind::ShortestPath => "shortest_path",
        }
    }
}

impl FromStr for ChallengeKind {
    type Err = ChallengeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sorted_list" => Ok(ChallengeKind::SortedList),
            "reverse_sorted_list" => Ok(ChallengeKind::ReverseSortedList),
            "shortest_path" => Ok(ChallengeKind::ShortestPath),
            other => Err(ChallengeError::UnknownChallenge(other.to_string())),
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        }
    }
}

/// Parameters of a sorted-list / reverse-sorted-list challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortedListParams {
    pub nb_elements: usize,
    pub order: SortOrder,
}

impl SortedListParams {
    pub fn new(nb_elements: usize, order: SortOrder) -> Result<Self, ChallengeError> {
        if nb_elements == 0 {
            return Err(ChallengeError::TooFewElements);
        }
        if nb_elements > MAX_SORTED_ELEMENTS {
            return Err(ChallengeError::TooManyElements(nb_elements));
        }
        Ok(Self { nb_elements, order })
    }

    pub fn kind(&self) -> ChallengeKind {
        match self.order {
            SortOrder::Ascending => ChallengeKind::SortedList,
            SortOrder::Descending => ChallengeKind::ReverseSortedList,
        }
    }
}

/// Parameters of a shortest-path challenge. `grid_size` counts the border.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShortestPathParams {
    pub grid_size: usize,
    pub nb_blockers: usize,
}

impl ShortestPathParams {
    pub fn new(grid_size: usize, nb_blockers: usize) -> Result<Self, ChallengeError> {
        if grid_size < MIN_GRID_SIZE {
            return Err(ChallengeError::GridTooSmall(grid_size));
        }
        if grid_size > MAX_GRID_SIZE {
            return Err(ChallengeError::GridTooLarge(grid_size));
        }
        Ok(Self {
            grid_size,
            nb_blockers,
        })
    }
}

/// Canonical sorted-list serialization: decimal values, no separators.
pub fn write_sequence(out: &mut String, values: &[u64]) {
    out.clear();
    for value in values {
        let _ = write!(out, "{value}");
    }
}
