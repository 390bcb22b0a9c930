//! Shortest-path witness: a generated grid, solved and cross-verified.

use std::fmt::Write as _;

use challenge_core::{
    sha256, ChallengeError, ChallengeRng, Digest, HexPrefix, SeedDeriver, ShortestPathParams,
};
use pathfinder::{Cell, Grid, GridError, PathVerifier, Position, Verdict};

use crate::CandidatePredicate;

/// Canonical path serialization: `row` then `col` in decimal for every cell,
/// no separators.
pub fn write_path(out: &mut String, path: &[Position]) {
    out.clear();
    for p in path {
        let _ = write!(out, "{}{}", p.row, p.col);
    }
}

#[derive(Debug)]
pub struct ShortestPathPredicate {
    prefix: HexPrefix,
    params: ShortestPathParams,
    seeds: SeedDeriver,
    rng: ChallengeRng,
    grid: Grid,
    verifier: PathVerifier,
    start: Position,
    end: Position,
    text: String,
}

impl ShortestPathPredicate {
    pub fn new(
        previous_hash: &str,
        prefix: HexPrefix,
        params: ShortestPathParams,
    ) -> Result<Self, ChallengeError> {
        let grid = Grid::new(params.grid_size).map_err(|e| match e {
            GridError::TooSmall(n) => ChallengeError::GridTooSmall(n),
            GridError::TooLarge(n) => ChallengeError::GridTooLarge(n),
        })?;
        Ok(Self {
            prefix,
            params,
            seeds: SeedDeriver::new(previous_hash),
            rng: ChallengeRng::new(0),
            grid,
            verifier: PathVerifier::with_grid_size(params.grid_size),
            start: Position::default(),
            end: Position::default(),
            text: String::with_capacity(params.grid_size * 16),
        })
    }

    pub fn params(&self) -> &ShortestPathParams {
        &self.params
    }

    fn draw(&mut self) -> Position {
        let size = self.params.grid_size as u64;
        let row = self.rng.next_below(size) as i32;
        let col = self.rng.next_below(size) as i32;
        Position::new(row, col)
    }

    /// Rebuilds the grid for `nonce`.
    ///
    /// Start and end are redrawn until they land inside the border (and, for
    /// the end, away from the start). Each of the `nb_blockers` draws then
    /// places one blocker; a draw on the border, the start or the end is
    /// dropped without a redraw.
    pub fn generate(&mut self, nonce: u64) {
        self.rng.reseed(self.seeds.derive(nonce));
        self.grid.clear();

        let mut start = self.draw();
        while !self.grid.is_interior(start) {
            start = self.draw();
        }
        let mut end = self.draw();
        while !self.grid.is_interior(end) || end == start {
            end = self.draw();
        }

        self.grid.set(start, Cell::Start);
        self.grid.set(end, Cell::End);
        for _ in 0..self.params.nb_blockers {
            let blocker = self.draw();
            if blocker != start && blocker != end {
                self.grid.set(blocker, Cell::Blocker);
            }
        }

        self.start = start;
        self.end = end;
    }

    /// Generates the grid for `nonce` and runs the verifier on it.
    pub fn solve(&mut self, nonce: u64) -> Verdict {
        self.generate(nonce);
        self.verifier.verify(&self.grid, self.start, self.end)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    /// Path from the last `solve`; only meaningful after `Verdict::Accepted`.
    pub fn path(&self) -> &[Position] {
        self.verifier.path()
    }

    pub fn verifier(&self) -> &PathVerifier {
        &self.verifier
    }

    /// Canonical serialization of the last accepted path.
    pub fn serialized(&self) -> &str {
        &self.text
    }
}

impl CandidatePredicate for ShortestPathPredicate {
    fn name(&self) -> &'static str {
        "shortest_path"
    }

    fn prefix(&self) -> &HexPrefix {
        &self.prefix
    }

    fn witness_digest(&mut self, nonce: u64) -> Option<Digest> {
        match self.solve(nonce) {
            Verdict::Accepted => {
                write_path(&mut self.text, self.verifier.path());
                Some(sha256(self.text.as_bytes()))
            }
            Verdict::Unreachable | Verdict::Mismatch => {
                self.text.clear();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREV: &str = "9551d9f2b91df3381938ddc8ee97dcf0663113ceacd8f766912aa6bcf35bb18b";

    fn predicate(prev: &str, grid_size: usize, nb_blockers: usize, prefix: &str) -> ShortestPathPredicate {
        ShortestPathPredicate::new(
            prev,
            HexPrefix::new(prefix).unwrap(),
            ShortestPathParams::new(grid_size, nb_blockers).unwrap(),
        )
        .unwrap()
    }

    fn cells(v: &[(i32, i32)]) -> Vec<Position> {
        v.iter().map(|&p| Position::from(p)).collect()
    }

    #[test]
    fn path_regression_vector() {
        let mut p = predicate(PREV, 25, 80, "8fe4");
        assert_eq!(p.solve(21723), Verdict::Accepted);
        assert_eq!(p.start(), Position::new(7, 11));
        assert_eq!(p.end(), Position::new(10, 5));
        assert_eq!(p.grid().count(Cell::Blocker), 61);
        assert_eq!(
            p.path(),
            cells(&[
                (7, 11),
                (7, 10),
                (7, 9),
                (7, 8),
                (7, 7),
                (7, 6),
                (8, 6),
                (8, 5),
                (9, 5),
                (10, 5)
            ])
            .as_slice()
        );

        let digest = p.witness_digest(21723).unwrap();
        assert_eq!(
            hex::encode(digest),
            "8fe4ed64fc0397a07dfe3a270d7e148aeb9fbac7c54d1eb870d0f379c0f4c211"
        );
        assert!(p.test(21723));
        assert_eq!(p.serialized(), "71171079787776868595105");
    }

    #[test]
    fn negative_regression_vector() {
        let prev = "72c59bc893cc40dd9101500b558bdd35e612e935339bd017eb69802391d0d038";
        let mut p = predicate(prev, 25, 80, "7134");
        assert!(!p.test(114393));
        assert_eq!(
            p.witness_digest(114393).map(hex::encode).as_deref(),
            Some("c8614849f79ac395de360b046f67c8ad124a7b028c8ae5cb3b9ad50e4908b3e8")
        );
    }

    #[test]
    fn verifier_mismatch_is_a_non_match() {
        let mut p = predicate(PREV, 25, 80, "");
        assert_eq!(p.solve(27), Verdict::Mismatch);
        assert_eq!(p.witness_digest(27), None);
        assert!(!p.test(27), "even the empty prefix rejects a mismatch");
    }

    #[test]
    fn unreachable_end_is_a_non_match() {
        let mut p = predicate(PREV, 8, 40, "");
        assert_eq!(p.solve(2), Verdict::Unreachable);
        assert_eq!(p.start(), Position::new(6, 5));
        assert_eq!(p.end(), Position::new(2, 1));
        assert!(!p.test(2));
    }

    #[test]
    fn generated_grids_respect_the_border() {
        let mut p = predicate(PREV, 10, 60, "");
        for nonce in 0..50 {
            p.generate(nonce);
            let grid = p.grid();
            assert!(grid.is_interior(p.start()));
            assert!(grid.is_interior(p.end()));
            assert_ne!(p.start(), p.end());
            assert_eq!(grid.cell(p.start()), Cell::Start);
            assert_eq!(grid.cell(p.end()), Cell::End);
            assert_eq!(grid.count(Cell::Start), 1);
            assert_eq!(grid.count(Cell::End), 1);
            assert!(grid.count(Cell::Blocker) <= 60);
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let mut a = predicate(PREV, 25, 80, "");
        let mut b = predicate(PREV, 25, 80, "");
        a.generate(5);
        b.generate(900);
        b.generate(5);
        assert_eq!(a.grid(), b.grid());
        assert_eq!(a.start(), b.start());
        assert_eq!(a.end(), b.end());
    }

    #[test]
    fn path_serialization() {
        let mut out = String::from("stale");
        write_path(&mut out, &cells(&[(7, 11), (10, 5)]));
        assert_eq!(out, "711105");
    }

    #[test]
    fn rejects_grid_without_room() {
        // Params validation is bypassed to exercise the grid constructor path.
        let params = ShortestPathParams {
            grid_size: 2,
            nb_blockers: 0,
        };
        let err = ShortestPathPredicate::new(PREV, HexPrefix::new("").unwrap(), params)
            .unwrap_err();
        assert_eq!(err, ChallengeError::GridTooSmall(2));
    }
}
