//! Cross-checks A* against Dijkstra before a path is trusted.

use crate::codec::Position;
use crate::grid::Grid;
use crate::search::{Path, PathFinder, SearchMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Both searches returned the same cell sequence.
    Accepted,
    /// No path exists.
    Unreachable,
    /// Both found a shortest path but not the same one. The candidate is
    /// dropped, not treated as a fault.
    Mismatch,
}

/// Owns a `PathFinder` and both result buffers, reused across calls.
#[derive(Clone, Debug, Default)]
pub struct PathVerifier {
    finder: PathFinder,
    astar: Path,
    dijkstra: Path,
}

impl PathVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid_size(grid_size: usize) -> Self {
        Self {
            finder: PathFinder::with_grid_size(grid_size),
            astar: Path::with_capacity(grid_size * 2),
            dijkstra: Path::with_capacity(grid_size * 2),
        }
    }

    pub fn verify(&mut self, grid: &Grid, start: Position, end: Position) -> Verdict {
        if !self
            .finder
            .search(grid, start, end, SearchMode::AStar, &mut self.astar)
        {
            // Both modes are complete, so Dijkstra cannot succeed either.
            self.dijkstra.clear();
            return Verdict::Unreachable;
        }
        self.finder
            .search(grid, start, end, SearchMode::Dijkstra, &mut self.dijkstra);

        if self.astar == self.dijkstra {
            Verdict::Accepted
        } else {
            log::debug!(
                target: "pathfinder",
                "A*/Dijkstra disagree: {} vs {} cells from {:?} to {:?}",
                self.astar.len(),
                self.dijkstra.len(),
                start,
                end
            );
            Verdict::Mismatch
        }
    }

    /// The path from the last `verify`; meaningful when it returned `Accepted`.
    pub fn path(&self) -> &[Position] {
        &self.astar
    }

    pub fn astar_path(&self) -> &[Position] {
        &self.astar
    }

    pub fn dijkstra_path(&self) -> &[Position] {
        &self.dijkstra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;

    #[test]
    fn open_grid_is_accepted_and_matches_both_modes() {
        let grid = Grid::new(7).unwrap();
        let mut verifier = PathVerifier::with_grid_size(7);
        let start = Position::new(1, 1);
        let end = Position::new(5, 5);
        assert_eq!(verifier.verify(&grid, start, end), Verdict::Accepted);
        assert_eq!(verifier.path().len(), 9);
        assert_eq!(verifier.astar_path(), verifier.dijkstra_path());
    }

    #[test]
    fn enclosed_end_is_unreachable() {
        let mut grid = Grid::new(7).unwrap();
        let end = Position::new(3, 3);
        for p in [
            Position::new(2, 3),
            Position::new(4, 3),
            Position::new(3, 2),
            Position::new(3, 4),
        ] {
            grid.set(p, Cell::Blocker);
        }
        let mut verifier = PathVerifier::new();
        assert_eq!(
            verifier.verify(&grid, Position::new(1, 1), end),
            Verdict::Unreachable
        );
        assert!(verifier.path().is_empty());
        assert!(verifier.dijkstra_path().is_empty());
    }

    #[test]
    fn equal_cost_paths_that_differ_are_a_mismatch() {
        let mut grid = Grid::new(6).unwrap();
        grid.set(Position::new(3, 2), Cell::Blocker);
        grid.set(Position::new(4, 3), Cell::Blocker);
        let start = Position::new(3, 4);
        let end = Position::new(3, 1);

        let mut verifier = PathVerifier::new();
        assert_eq!(verifier.verify(&grid, start, end), Verdict::Mismatch);

        let cells = |v: &[(i32, i32)]| v.iter().map(|&p| Position::from(p)).collect::<Vec<_>>();
        assert_eq!(
            verifier.astar_path(),
            cells(&[(3, 4), (3, 3), (2, 3), (2, 2), (2, 1), (3, 1)]).as_slice()
        );
        assert_eq!(
            verifier.dijkstra_path(),
            cells(&[(3, 4), (2, 4), (2, 3), (2, 2), (2, 1), (3, 1)]).as_slice()
        );
    }

    #[test]
    fn verifier_recovers_after_a_mismatch() {
        let mut grid = Grid::new(6).unwrap();
        grid.set(Position::new(3, 2), Cell::Blocker);
        grid.set(Position::new(4, 3), Cell::Blocker);
        let mut verifier = PathVerifier::with_grid_size(6);
        assert_eq!(
            verifier.verify(&grid, Position::new(3, 4), Position::new(3, 1)),
            Verdict::Mismatch
        );
        grid.clear();
        assert_eq!(
            verifier.verify(&grid, Position::new(1, 1), Position::new(1, 4)),
            Verdict::Accepted
        );
        assert_eq!(verifier.path().len(), 4);
    }
}
