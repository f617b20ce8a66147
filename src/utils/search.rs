//! # Grid Search
//!
//! Four-connected reachability and shortest paths over any cell predicate, built on the
//! `pathfinding` crate.

use crate::Position;
use pathfinding::prelude::{astar, bfs_reach};
use std::collections::HashSet;

/// Walkable orthogonal neighbours of `pos`.
fn successors<F>(pos: Position, passable: &F) -> Vec<Position>
where
    F: Fn(Position) -> bool,
{
    pos.orthogonal_neighbours()
        .into_iter()
        .filter(|&next| passable(next))
        .collect()
}

/// Every cell reachable from `start` through four-directional steps onto passable cells.
///
/// The start cell is always included, passable or not.
///
/// # Examples
///
/// ```
/// use delve::{reachable_cells, Position};
///
/// // A 3-cell horizontal strip
/// let reach = reachable_cells(Position::new(0, 0), |p| p.y == 0 && (0..3).contains(&p.x));
/// assert_eq!(reach.len(), 3);
/// ```
pub fn reachable_cells<F>(start: Position, passable: F) -> HashSet<Position>
where
    F: Fn(Position) -> bool,
{
    bfs_reach(start, |&pos| successors(pos, &passable)).collect()
}

/// Shortest four-directional path from `start` to `goal`, both ends included.
///
/// The goal does not need to be passable itself, which lets callers path "into" an
/// occupied cell such as an enemy. Returns None when no route exists.
pub fn find_path<F>(start: Position, goal: Position, passable: F) -> Option<Vec<Position>>
where
    F: Fn(Position) -> bool,
{
    astar(
        &start,
        |&pos| {
            let mut next = successors(pos, &passable);
            if pos.is_orthogonally_adjacent(goal) && !next.contains(&goal) {
                next.push(goal);
            }
            next.into_iter().map(|p| (p, 1u32))
        },
        |&pos| pos.manhattan_distance(goal),
        |&pos| pos == goal,
    )
    .map(|(path, _cost)| path)
}
