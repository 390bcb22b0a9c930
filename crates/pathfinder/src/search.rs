//! Best-first search (A* or Dijkstra) over the 4-connected grid.

use crate::codec::{decode, encode, Coordinate, EncodedPosition, Position};
use crate::frontier::Frontier;
use crate::grid::Grid;

/// Start to end inclusive; empty when the end is unreachable.
pub type Path = Vec<Position>;

const MOVEMENT_COST: u32 = 1;
const NO_COST: u32 = u32::MAX;

/// Expansion order: +row, -row, +col, -col. Only decides between equal-cost
/// paths, but results must reproduce it exactly.
const DIRECTIONS: [(Coordinate, Coordinate); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Manhattan-distance heuristic.
    AStar,
    /// No heuristic.
    Dijkstra,
}

impl SearchMode {
    #[inline]
    fn priority(self, cost: u32, next: Position, end: Position) -> u32 {
        match self {
            SearchMode::AStar => cost + next.manhattan(end),
            SearchMode::Dijkstra => cost,
        }
    }
}

/// Reusable search state.
///
/// `came_from` and `cost_so_far` are dense per-cell tables; they are resized
/// when the grid size changes and otherwise only refilled, so a worker that
/// keeps one `PathFinder` does not allocate per search.
#[derive(Clone, Debug, Default)]
pub struct PathFinder {
    came_from: Vec<EncodedPosition>,
    cost_so_far: Vec<u32>,
    frontier: Frontier,
    stride: usize,
}

impl PathFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sizes the tables for `grid_size x grid_size` grids.
    pub fn with_grid_size(grid_size: usize) -> Self {
        let area = grid_size * grid_size;
        Self {
            came_from: vec![0; area],
            cost_so_far: vec![NO_COST; area],
            frontier: Frontier::with_capacity(area),
            stride: grid_size,
        }
    }

    fn prepare(&mut self, grid_size: usize) {
        let area = grid_size * grid_size;
        self.came_from.resize(area, 0);
        self.cost_so_far.clear();
        self.cost_so_far.resize(area, NO_COST);
        self.frontier.clear();
        self.stride = grid_size;
    }

    #[inline]
    fn slot(&self, key: EncodedPosition) -> usize {
        let p = decode(key);
        p.row as usize * self.stride + p.col as usize
    }

    /// Writes the shortest `start -> end` path into `path` and returns whether
    /// one exists. An unreachable end, or a start/end off the interior,
    /// leaves `path` empty.
    pub fn search(
        &mut self,
        grid: &Grid,
        start: Position,
        end: Position,
        mode: SearchMode,
        path: &mut Path,
    ) -> bool {
        path.clear();
        if !grid.is_interior(start) || !grid.is_interior(end) {
            return false;
        }
        self.prepare(grid.size());

        let start_key = encode(start);
        let end_key = encode(end);
        let start_slot = self.slot(start_key);
        self.cost_so_far[start_slot] = 0;
        self.came_from[start_slot] = start_key;
        self.frontier.push(0, start_key);

        while let Some(current_key) = self.frontier.pop() {
            if current_key == end_key {
                self.reconstruct(start_key, end_key, path);
                return true;
            }

            let current = decode(current_key);
            let current_cost = self.cost_so_far[self.slot(current_key)];
            let new_cost = current_cost + MOVEMENT_COST;

            for (d_row, d_col) in DIRECTIONS {
                let next = current.offset(d_row, d_col);
                if !grid.is_passable(next) {
                    continue;
                }
                let next_key = encode(next);
                let next_slot = self.slot(next_key);
                // NO_COST doubles as "never reached".
                if new_cost < self.cost_so_far[next_slot] {
                    self.cost_so_far[next_slot] = new_cost;
                    self.came_from[next_slot] = current_key;
                    self.frontier
                        .push(mode.priority(new_cost, next, end), next_key);
                }
            }
        }

        false
    }

    fn reconstruct(&self, start_key: EncodedPosition, end_key: EncodedPosition, path: &mut Path) {
        let mut key = end_key;
        while key != start_key {
            path.push(decode(key));
            key = self.came_from[self.slot(key)];
        }
        path.push(decode(start_key));
        path.reverse();
    }

    /// Cost of the last search to `p`, if it was reached.
    #[cfg(test)]
    fn cost_to(&self, p: Position) -> Option<u32> {
        let slot = p.row as usize * self.stride + p.col as usize;
        match self.cost_so_far.get(slot) {
            Some(&cost) if cost != NO_COST => Some(cost),
            _ => None,
        }
    }
}
