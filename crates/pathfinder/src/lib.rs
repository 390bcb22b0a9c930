#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Shortest-path engine for the path-witness challenge.
//!
//! The search runs over a square grid whose outer ring is an implicit wall: it
//! is never stored as blocker cells, and any neighbour on it is simply skipped.
//! Movement is 4-connected with unit cost.
//!
//! Hot-path layout:
//! - Positions are packed into a `u32` (16 bits per axis) so identity checks are
//!   single integer compares.
//! - Frontier entries pack `(priority, position)` into a `u64`, so the heap's
//!   natural integer order gives the required tie-break on equal priorities.
//! - Predecessor and cost tables are dense arrays indexed by cell, owned by a
//!   `PathFinder` and reused across searches.
//!
//! `PathVerifier` runs the search twice (A* and Dijkstra) and only accepts a
//! path when both runs produce the exact same sequence of cells.

pub mod codec;
pub mod frontier;
pub mod grid;
pub mod search;
pub mod verify;

pub use codec::{decode, encode, Coordinate, EncodedPosition, Position};
pub use frontier::Frontier;
pub use grid::{Cell, Grid, GridError};
pub use search::{Path, PathFinder, SearchMode};
pub use verify::{PathVerifier, Verdict};
