//! Square challenge grid with an implicit wall around it.

use core::fmt;

use crate::codec::Position;

// Structural limits of a `Grid`: at least one interior cell, and coordinates
// that fit the 16-bit position packing. Challenge parameters are validated
// against the stricter `challenge_core::MIN_GRID_SIZE` before a grid is built.
const MIN_SIZE: usize = 3;
const MAX_SIZE: usize = 0xFFFF;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cell {
    #[default]
    Empty,
    Blocker,
    Start,
    End,
}

impl Cell {
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Blocker => '#',
            Cell::Start => 's',
            Cell::End => 'e',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("grid size {0} has no interior (minimum is 3)")]
    TooSmall(usize),
    #[error("grid size {0} exceeds the maximum of 65535")]
    TooLarge(usize),
}

/// `size x size` cells, row-major. The border ring is part of the size but is
/// never written; it always reads as a blocker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(size: usize) -> Result<Self, GridError> {
        if size < MIN_SIZE {
            return Err(GridError::TooSmall(size));
        }
        if size > MAX_SIZE {
            return Err(GridError::TooLarge(size));
        }
        Ok(Self {
            size,
            cells: vec![Cell::Empty; size * size],
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Resets every cell to `Empty`, keeping the allocation.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::Empty);
    }

    /// Strictly inside the border: `1 <= row, col <= size - 2`.
    #[inline]
    pub fn is_interior(&self, p: Position) -> bool {
        let last = self.size as i64 - 1;
        let (row, col) = (i64::from(p.row), i64::from(p.col));
        row > 0 && row < last && col > 0 && col < last
    }

    #[inline]
    pub fn is_passable(&self, p: Position) -> bool {
        self.is_interior(p) && self.cells[self.index(p)] != Cell::Blocker
    }

    /// Border and out-of-grid positions read as `Blocker`.
    pub fn cell(&self, p: Position) -> Cell {
        if self.is_interior(p) {
            self.cells[self.index(p)]
        } else {
            Cell::Blocker
        }
    }

    /// Writes an interior cell. Returns `false` (and writes nothing) for the
    /// border or anything outside the grid.
    pub fn set(&mut self, p: Position, cell: Cell) -> bool {
        if !self.is_interior(p) {
            return false;
        }
        let index = self.index(p);
        self.cells[index] = cell;
        true
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// Row-major index of an interior position.
    #[inline]
    pub fn index(&self, p: Position) -> usize {
        p.row as usize * self.size + p.col as usize
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.size {
            let line: String = (0..self.size)
                .map(|col| self.cell(Position::new(row as i32, col as i32)).symbol())
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
