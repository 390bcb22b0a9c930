//! Position packing: row in the high 16 bits, column in the low 16 bits.
//!
//! Coordinates outside `0..=0xFFFF` are truncated; callers keep positions
//! inside the grid, whose size is capped accordingly.

pub type Coordinate = i32;

/// Packed `(row, col)`. Integer order equals lexicographic `(row, col)` order.
pub type EncodedPosition = u32;

const AXIS_MASK: u32 = 0xFFFF;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: Coordinate,
    pub col: Coordinate,
}

impl Position {
    pub const fn new(row: Coordinate, col: Coordinate) -> Self {
        Self { row, col }
    }

    #[inline]
    pub fn offset(self, d_row: Coordinate, d_col: Coordinate) -> Self {
        Self::new(self.row + d_row, self.col + d_col)
    }

    /// Manhattan distance.
    #[inline]
    pub fn manhattan(self, other: Position) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl From<(Coordinate, Coordinate)> for Position {
    fn from((row, col): (Coordinate, Coordinate)) -> Self {
        Self::new(row, col)
    }
}

#[inline]
pub fn encode(p: Position) -> EncodedPosition {
    ((p.row as u32 & AXIS_MASK) << 16) | (p.col as u32 & AXIS_MASK)
}

#[inline]
pub fn decode(n: EncodedPosition) -> Position {
    Position::new((n >> 16) as Coordinate, (n & AXIS_MASK) as Coordinate)
}
