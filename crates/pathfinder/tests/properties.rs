use std::collections::VecDeque;

use pathfinder::{decode, encode, Cell, Grid, Path, PathFinder, PathVerifier, Position, SearchMode, Verdict};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Scenario {
    grid: Grid,
    start: Position,
    end: Position,
}

fn scenario() -> impl Strategy<Value = Scenario> {
    (3usize..14).prop_flat_map(|size| {
        let interior = (1..size as i32 - 1, 1..size as i32 - 1);
        (
            Just(size),
            interior.clone(),
            interior.clone(),
            prop::collection::vec(interior, 0..size * size / 2),
        )
            .prop_map(|(size, start, end, blockers)| {
                let mut grid = Grid::new(size).unwrap();
                let start = Position::from(start);
                let end = Position::from(end);
                for p in blockers {
                    let p = Position::from(p);
                    if p != start && p != end {
                        grid.set(p, Cell::Blocker);
                    }
                }
                grid.set(start, Cell::Start);
                if end != start {
                    grid.set(end, Cell::End);
                }
                Scenario { grid, start, end }
            })
    })
}

/// Plain breadth-first distance, independent of the engine under test.
fn bfs_distance(grid: &Grid, start: Position, end: Position) -> Option<usize> {
    let size = grid.size();
    let mut dist = vec![usize::MAX; size * size];
    let mut queue = VecDeque::new();
    dist[grid.index(start)] = 0;
    queue.push_back(start);
    while let Some(p) = queue.pop_front() {
        if p == end {
            return Some(dist[grid.index(p)]);
        }
        for (dr, dc) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let n = p.offset(dr, dc);
            if grid.is_passable(n) && dist[grid.index(n)] == usize::MAX {
                dist[grid.index(n)] = dist[grid.index(p)] + 1;
                queue.push_back(n);
            }
        }
    }
    None
}

fn assert_well_formed(grid: &Grid, path: &[Position], start: Position, end: Position) {
    assert_eq!(path.first(), Some(&start));
    assert_eq!(path.last(), Some(&end));
    for pair in path.windows(2) {
        assert_eq!(pair[0].manhattan(pair[1]), 1);
    }
    assert!(path.iter().all(|&p| grid.is_passable(p)));
    let mut cells: Vec<_> = path.iter().map(|&p| encode(p)).collect();
    cells.sort_unstable();
    cells.dedup();
    assert_eq!(cells.len(), path.len());
}

proptest! {
    #[test]
    fn codec_round_trips(row in 0i32..=0xFFFF, col in 0i32..=0xFFFF) {
        let p = Position::new(row, col);
        prop_assert_eq!(decode(encode(p)), p);
    }

    #[test]
    fn both_modes_find_optimal_well_formed_paths(s in scenario()) {
        let mut finder = PathFinder::new();
        let mut astar = Path::new();
        let mut dijkstra = Path::new();
        let found_a = finder.search(&s.grid, s.start, s.end, SearchMode::AStar, &mut astar);
        let found_d = finder.search(&s.grid, s.start, s.end, SearchMode::Dijkstra, &mut dijkstra);
        let reference = bfs_distance(&s.grid, s.start, s.end);

        prop_assert_eq!(found_a, reference.is_some());
        prop_assert_eq!(found_d, reference.is_some());
        if let Some(distance) = reference {
            assert_well_formed(&s.grid, &astar, s.start, s.end);
            assert_well_formed(&s.grid, &dijkstra, s.start, s.end);
            prop_assert_eq!(astar.len(), distance + 1);
            prop_assert_eq!(dijkstra.len(), distance + 1);
        } else {
            prop_assert!(astar.is_empty());
            prop_assert!(dijkstra.is_empty());
        }
    }

    #[test]
    fn verifier_accepts_exactly_identical_paths(s in scenario()) {
        let mut finder = PathFinder::new();
        let mut astar = Path::new();
        let mut dijkstra = Path::new();
        finder.search(&s.grid, s.start, s.end, SearchMode::AStar, &mut astar);
        finder.search(&s.grid, s.start, s.end, SearchMode::Dijkstra, &mut dijkstra);

        let mut verifier = PathVerifier::new();
        let verdict = verifier.verify(&s.grid, s.start, s.end);
        let expected = if astar.is_empty() {
            Verdict::Unreachable
        } else if astar == dijkstra {
            Verdict::Accepted
        } else {
            Verdict::Mismatch
        };
        prop_assert_eq!(verdict, expected);
        if verdict == Verdict::Accepted {
            prop_assert_eq!(verifier.path(), astar.as_slice());
        }
    }

    #[test]
    fn repeated_searches_are_deterministic(s in scenario()) {
        let mut finder = PathFinder::new();
        let mut first = Path::new();
        let mut second = Path::new();
        finder.search(&s.grid, s.start, s.end, SearchMode::AStar, &mut first);
        finder.search(&s.grid, s.start, s.end, SearchMode::Dijkstra, &mut second);
        finder.search(&s.grid, s.start, s.end, SearchMode::AStar, &mut second);
        prop_assert_eq!(first, second);
    }
}
