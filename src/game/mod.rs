//! # Game Module
//!
//! Core simulation types: coordinates, actors and their gear, the world query seam,
//! movement and combat resolution, enemy policy, the turn scheduler and the level session.

pub mod actor;
pub mod combat;
pub mod encounter;
pub mod equipment;
pub mod events;
pub mod movement;
pub mod policy;
pub mod rules;
pub mod scheduler;
pub mod state;
pub mod world;

pub use actor::*;
pub use combat::*;
pub use encounter::*;
pub use equipment::*;
pub use events::*;
pub use movement::*;
pub use policy::*;
pub use rules::*;
pub use scheduler::*;
pub use state::*;
pub use world::*;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Represents a cell coordinate on the level grid.
///
/// `y` grows downwards. Positions order row-major (by `y`, then `x`), which is the
/// order spawned enemies take their turns in.
///
/// # Examples
///
/// ```
/// use delve::Position;
///
/// let pos = Position::new(10, 5);
/// assert_eq!(pos.x, 10);
/// assert_eq!(pos.y, 5);
///
/// let neighbours = pos.orthogonal_neighbours();
/// assert_eq!(neighbours.len(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Calculates the Manhattan distance to another position.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::Position;
    ///
    /// let pos1 = Position::new(0, 0);
    /// let pos2 = Position::new(3, 4);
    /// assert_eq!(pos1.manhattan_distance(pos2), 7);
    /// ```
    pub fn manhattan_distance(self, other: Position) -> u32 {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as u32
    }

    /// Returns the four orthogonal neighbours (N, W, E, S).
    pub fn orthogonal_neighbours(self) -> [Position; 4] {
        [
            Position::new(self.x, self.y - 1),
            Position::new(self.x - 1, self.y),
            Position::new(self.x + 1, self.y),
            Position::new(self.x, self.y + 1),
        ]
    }

    /// Returns all 8 surrounding positions (including diagonals).
    pub fn surrounding_positions(self) -> [Position; 8] {
        [
            Position::new(self.x - 1, self.y - 1),
            Position::new(self.x, self.y - 1),
            Position::new(self.x + 1, self.y - 1),
            Position::new(self.x - 1, self.y),
            Position::new(self.x + 1, self.y),
            Position::new(self.x - 1, self.y + 1),
            Position::new(self.x, self.y + 1),
            Position::new(self.x + 1, self.y + 1),
        ]
    }

    /// Returns the neighbouring position one step in `direction`.
    pub fn step(self, direction: Direction) -> Position {
        self + direction.to_delta()
    }

    /// Checks orthogonal adjacency: exactly one axis differs by exactly 1.
    ///
    /// This is the range test for attacks, so diagonals never qualify.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::Position;
    ///
    /// assert!(Position::new(3, 3).is_orthogonally_adjacent(Position::new(4, 3)));
    /// assert!(!Position::new(3, 3).is_orthogonally_adjacent(Position::new(4, 4)));
    /// ```
    pub fn is_orthogonally_adjacent(self, other: Position) -> bool {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        (dx == 1 && dy == 0) || (dx == 0 && dy == 1)
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Orthogonal movement directions. Diagonal movement is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// All four directions, in the order random picks index into.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Converts a direction to a position delta.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Direction, Position};
    ///
    /// let delta = Direction::North.to_delta();
    /// assert_eq!(delta, Position::new(0, -1));
    /// ```
    pub fn to_delta(self) -> Position {
        match self {
            Direction::North => Position::new(0, -1),
            Direction::South => Position::new(0, 1),
            Direction::East => Position::new(1, 0),
            Direction::West => Position::new(-1, 0),
        }
    }

    /// Converts a unit orthogonal delta to a direction.
    ///
    /// Returns None for diagonals, zero and anything longer than one cell.
    pub fn from_delta(delta: Position) -> Option<Direction> {
        match (delta.x, delta.y) {
            (0, -1) => Some(Direction::North),
            (0, 1) => Some(Direction::South),
            (1, 0) => Some(Direction::East),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }

    /// Returns the direction pointing the other way.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }
}

/// Unique identifier for actors.
pub type ActorId = Uuid;

/// Creates a new unique actor ID.
pub fn new_actor_id() -> ActorId {
    Uuid::new_v4()
}
