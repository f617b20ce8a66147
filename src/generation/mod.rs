//! # Generation Module
//!
//! Procedural level generation: room-and-corridor layouts and special tile placement.
//!
//! Generation is a pure function of a [`GenerationConfig`] and a seeded RNG. The output
//! is a [`DungeonLayout`]: the final grid, the special tile placements, and the
//! intermediate rooms and corridor cells kept for diagnostics and invariant checks.

pub mod dungeon;
pub mod encounters;

pub use dungeon::*;
pub use encounters::*;

use crate::config::{
    DEFAULT_DUNGEON_HEIGHT, DEFAULT_DUNGEON_WIDTH, DEFAULT_ROOM_COUNT, MAX_GRID_SIDE, PLACEMENT_ATTEMPTS,
};
use crate::{Grid, Position, SpecialTile, SpecialTiles};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Errors raised while generating a level.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The parameters cannot be satisfied within the configured retry caps
    #[error("level generation infeasible after {attempts} attempt(s): {reason}")]
    Infeasible { reason: String, attempts: u32 },

    /// Some floor cells cannot be reached from the player start
    #[error("{unreachable} floor cell(s) unreachable from the player start")]
    Disconnected { unreachable: usize },
}

impl GenerationError {
    pub fn infeasible(reason: impl Into<String>, attempts: u32) -> Self {
        GenerationError::Infeasible {
            reason: reason.into(),
            attempts,
        }
    }
}

/// Inclusive range of counts drawn uniformly per room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub const fn exactly(count: u32) -> Self {
        Self::new(count, count)
    }

    /// Draws a count. A range with `max < min` always yields `min`.
    pub fn sample(&self, rng: &mut StdRng) -> u32 {
        if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

/// Per-room tile counts for one size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeClassCounts {
    pub enemies: CountRange,
    pub traps: CountRange,
}

/// How many special tiles each room receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub small: SizeClassCounts,
    pub large: SizeClassCounts,
    /// Chance that a room gets a coin
    pub coin_chance: f64,
    /// Chance that a room gets a potion
    pub potion_chance: f64,
}

impl PlacementConfig {
    /// Counts for the given size class.
    pub fn counts(&self, size: RoomSize) -> SizeClassCounts {
        match size {
            RoomSize::Small => self.small,
            RoomSize::Large => self.large,
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            small: SizeClassCounts {
                enemies: CountRange::exactly(1),
                traps: CountRange::new(0, 1),
            },
            large: SizeClassCounts {
                enemies: CountRange::new(1, 2),
                traps: CountRange::new(1, 2),
            },
            coin_chance: 0.65,
            potion_chance: 0.7,
        }
    }
}

/// Configuration for procedural generation.
///
/// Controls the grid size, room sampling, retry caps and special tile density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Grid width in cells
    pub width: u32,
    /// Grid height in cells
    pub height: u32,
    /// Number of rooms to place
    pub num_rooms: u32,
    /// Minimum room side length
    pub room_min_size: u32,
    /// Maximum room side length
    pub room_max_size: u32,
    /// Rooms with both sides at most this long are "small"
    pub small_room_max: u32,
    /// Candidate rectangles sampled per room before the layout is thrown away
    pub max_room_attempts: u32,
    /// Whole-layout attempts before giving up with [`GenerationError::Infeasible`]
    pub max_generation_retries: u32,
    /// Random cells tried per special tile before it is abandoned
    pub placement_attempts: u32,
    pub placement: PlacementConfig,
}

impl GenerationConfig {
    /// Creates the standard configuration: a 30x30 grid with four rooms of side 4 to 10.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(7);
    /// assert_eq!(config.seed, 7);
    /// assert!(config.room_max_size >= config.room_min_size);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            width: DEFAULT_DUNGEON_WIDTH,
            height: DEFAULT_DUNGEON_HEIGHT,
            num_rooms: DEFAULT_ROOM_COUNT,
            room_min_size: 4,
            room_max_size: 10,
            small_room_max: 6,
            max_room_attempts: 200,
            max_generation_retries: 10,
            placement_attempts: PLACEMENT_ATTEMPTS,
            placement: PlacementConfig::default(),
        }
    }

    /// Creates a configuration for testing with smaller, simpler levels.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            width: 24,
            height: 24,
            num_rooms: 3,
            room_min_size: 4,
            room_max_size: 7,
            ..Self::new(seed)
        }
    }

    /// Rejects parameter combinations that can never produce a level.
    pub fn validate(&self) -> Result<(), GenerationError> {
        let reject = |reason: String| Err(GenerationError::infeasible(reason, 0));

        if self.num_rooms == 0 {
            return reject("at least one room is required".to_string());
        }
        if self.room_min_size == 0 || self.room_min_size > self.room_max_size {
            return reject(format!(
                "room size range {}..={} is empty",
                self.room_min_size, self.room_max_size
            ));
        }
        if self.width > MAX_GRID_SIDE || self.height > MAX_GRID_SIDE {
            return reject(format!(
                "{}x{} grid exceeds the {} cell side limit",
                self.width, self.height, MAX_GRID_SIDE
            ));
        }
        // A room needs a one-cell margin on the left/top and two on the right/bottom
        let with_margin = u64::from(self.room_max_size) + 3;
        if u64::from(self.width) < with_margin || u64::from(self.height) < with_margin {
            return reject(format!(
                "{}x{} grid cannot hold a {} cell room with its margin",
                self.width, self.height, self.room_max_size
            ));
        }
        let usable = (u64::from(self.width) - 3) * (u64::from(self.height) - 3);
        let room_area = u64::from(self.room_min_size).pow(2);
        let needed = u64::from(self.num_rooms).saturating_mul(room_area);
        if needed > usable {
            return reject(format!(
                "{} rooms of at least {} cells need {} cells, only {} are usable",
                self.num_rooms, room_area, needed, usable
            ));
        }
        if self.max_room_attempts == 0 || self.max_generation_retries == 0 {
            return reject("attempt caps must be positive".to_string());
        }
        for (name, chance) in [
            ("coin", self.placement.coin_chance),
            ("potion", self.placement.potion_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return reject(format!("{} chance {} is outside 0..=1", name, chance));
            }
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Size class of a room, which selects its special tile counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomSize {
    Small,
    Large,
}

/// An axis-aligned rectangle carved into the grid during generation.
///
/// Rooms only exist while a layout is built; the final grid does not tell rooms and
/// corridors apart. They are kept on the [`DungeonLayout`] for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Placement order; room 0 holds the player start
    pub id: u32,
    pub top_left: Position,
    pub width: u32,
    pub height: u32,
    /// Rooms this one was joined to by a corridor
    pub connections: Vec<u32>,
}

impl Room {
    /// Creates a new room with the given parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Position, Room};
    ///
    /// let room = Room::new(1, Position::new(5, 5), 10, 8);
    /// assert_eq!(room.center(), Position::new(10, 9));
    /// assert!(room.contains(Position::new(14, 12)));
    /// assert!(!room.contains(Position::new(15, 12)));
    /// ```
    pub fn new(id: u32, top_left: Position, width: u32, height: u32) -> Self {
        Self {
            id,
            top_left,
            width,
            height,
            connections: Vec::new(),
        }
    }

    /// Gets the bottom-right corner of the room.
    pub fn bottom_right(&self) -> Position {
        Position::new(
            self.top_left.x + self.width as i32 - 1,
            self.top_left.y + self.height as i32 - 1,
        )
    }

    /// Gets the center position of the room (rounded toward the top-left).
    pub fn center(&self) -> Position {
        Position::new(
            self.top_left.x + self.width as i32 / 2,
            self.top_left.y + self.height as i32 / 2,
        )
    }

    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    /// Checks if a position is inside this room.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.top_left.x
            && pos.y >= self.top_left.y
            && pos.x < self.top_left.x + self.width as i32
            && pos.y < self.top_left.y + self.height as i32
    }

    /// Checks if this room overlaps with another room. Rooms sharing only an edge line
    /// (touching) do not overlap.
    pub fn overlaps(&self, other: &Room) -> bool {
        !(self.top_left.x >= other.top_left.x + other.width as i32
            || other.top_left.x >= self.top_left.x + self.width as i32
            || self.top_left.y >= other.top_left.y + other.height as i32
            || other.top_left.y >= self.top_left.y + self.height as i32)
    }

    /// Gets all positions within this room, row-major.
    pub fn all_positions(&self) -> Vec<Position> {
        let mut positions = Vec::with_capacity(self.area() as usize);

        for y in self.top_left.y..(self.top_left.y + self.height as i32) {
            for x in self.top_left.x..(self.top_left.x + self.width as i32) {
                positions.push(Position::new(x, y));
            }
        }

        positions
    }

    /// Uniformly random cell inside the room.
    pub fn random_position(&self, rng: &mut StdRng) -> Position {
        Position::new(
            rng.gen_range(self.top_left.x..self.top_left.x + self.width as i32),
            rng.gen_range(self.top_left.y..self.top_left.y + self.height as i32),
        )
    }

    /// Small iff both sides are at most `small_max`.
    pub fn size_class(&self, small_max: u32) -> RoomSize {
        if self.width <= small_max && self.height <= small_max {
            RoomSize::Small
        } else {
            RoomSize::Large
        }
    }

    /// Adds a connection to another room.
    pub fn add_connection(&mut self, room_id: u32) {
        if !self.connections.contains(&room_id) {
            self.connections.push(room_id);
        }
    }
}

/// A special tile that could not be placed within its attempt cap.
///
/// The level is still usable; it simply has fewer items or hazards than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftPlacementFailure {
    pub room: u32,
    pub tile: SpecialTile,
    pub attempts: u32,
}

/// Finished output of a generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonLayout {
    pub grid: Grid,
    pub placements: SpecialTiles,
    pub rooms: Vec<Room>,
    /// Cells carved by corridors, including where they cross rooms
    pub corridors: BTreeSet<Position>,
    pub soft_failures: Vec<SoftPlacementFailure>,
}

impl DungeonLayout {
    pub fn is_corridor(&self, pos: Position) -> bool {
        self.corridors.contains(&pos)
    }

    pub fn player_start(&self) -> Option<Position> {
        self.placements.player_start()
    }
}

/// Trait for procedural generators.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random number generator.
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> Result<T, GenerationError>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> Result<(), GenerationError>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Creates a seeded random number generator from the config.
pub fn create_rng(config: &GenerationConfig) -> StdRng {
    StdRng::seed_from_u64(config.seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generation_config_creation() {
        let config = GenerationConfig::new(12345);
        assert_eq!(config.seed, 12345);
        assert_eq!(config.width, 30);
        assert_eq!(config.num_rooms, 4);
        assert_eq!(config.placement_attempts, 100);
        assert!(config.validate().is_ok());
        assert!(GenerationConfig::for_testing(1).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inconsistent_parameters() {
        let crowded = GenerationConfig {
            num_rooms: 50,
            ..GenerationConfig::new(1)
        };
        assert!(matches!(
            crowded.validate(),
            Err(GenerationError::Infeasible { .. })
        ));

        let inverted = GenerationConfig {
            room_min_size: 8,
            room_max_size: 5,
            ..GenerationConfig::new(1)
        };
        assert!(inverted.validate().is_err());

        let tiny_grid = GenerationConfig {
            width: 10,
            ..GenerationConfig::new(1)
        };
        assert!(tiny_grid.validate().is_err());

        let no_rooms = GenerationConfig {
            num_rooms: 0,
            ..GenerationConfig::new(1)
        };
        assert!(no_rooms.validate().is_err());
    }

    #[test]
    fn test_validate_handles_extreme_sizes() {
        let huge_rooms = GenerationConfig {
            room_min_size: u32::MAX,
            room_max_size: u32::MAX,
            ..GenerationConfig::new(1)
        };
        assert!(matches!(
            huge_rooms.validate(),
            Err(GenerationError::Infeasible { .. })
        ));

        let huge_grid = GenerationConfig {
            width: u32::MAX,
            height: u32::MAX,
            num_rooms: u32::MAX,
            room_min_size: 70_000,
            room_max_size: 70_000,
            ..GenerationConfig::new(1)
        };
        match huge_grid.validate() {
            Err(GenerationError::Infeasible { reason, .. }) => {
                assert!(reason.contains("side limit"))
            }
            other => panic!("expected an infeasible config, got {:?}", other),
        }

        let at_limit = GenerationConfig {
            width: MAX_GRID_SIDE,
            height: MAX_GRID_SIDE,
            num_rooms: u32::MAX,
            room_min_size: 4000,
            room_max_size: 4000,
            ..GenerationConfig::new(1)
        };
        assert!(at_limit.validate().is_err());
    }

    #[test]
    fn test_room_geometry() {
        let room = Room::new(1, Position::new(5, 5), 10, 8);

        assert_eq!(room.bottom_right(), Position::new(14, 12));
        assert_eq!(room.center(), Position::new(10, 9));
        assert_eq!(room.area(), 80);

        assert!(room.contains(Position::new(5, 5)));
        assert!(room.contains(Position::new(14, 12)));
        assert!(!room.contains(Position::new(4, 5)));
        assert!(!room.contains(Position::new(15, 12)));
    }

    #[test]
    fn test_room_overlap() {
        let room1 = Room::new(1, Position::new(5, 5), 10, 8);
        let room2 = Room::new(2, Position::new(10, 8), 6, 6);
        let room3 = Room::new(3, Position::new(20, 20), 5, 5);
        let touching = Room::new(4, Position::new(15, 5), 3, 3);

        assert!(room1.overlaps(&room2));
        assert!(room2.overlaps(&room1));
        assert!(!room1.overlaps(&room3));
        assert!(!room1.overlaps(&touching));
    }

    #[test]
    fn test_room_positions() {
        let room = Room::new(1, Position::new(5, 5), 4, 3);
        let positions = room.all_positions();
        assert_eq!(positions.len(), 12);
        let unique: HashSet<_> = positions.iter().collect();
        assert_eq!(unique.len(), 12);
        assert!(positions.iter().all(|&p| room.contains(p)));
    }

    #[test]
    fn test_room_size_class() {
        assert_eq!(Room::new(0, Position::new(1, 1), 6, 6).size_class(6), RoomSize::Small);
        assert_eq!(Room::new(0, Position::new(1, 1), 7, 4).size_class(6), RoomSize::Large);
        assert_eq!(Room::new(0, Position::new(1, 1), 4, 9).size_class(6), RoomSize::Large);
    }

    #[test]
    fn test_room_connections() {
        let mut room = Room::new(1, Position::new(5, 5), 10, 8);
        room.add_connection(2);
        room.add_connection(2);
        assert_eq!(room.connections, vec![2]);
    }

    #[test]
    fn test_count_range_sampling() {
        let mut rng = create_rng(&GenerationConfig::new(9));
        for _ in 0..100 {
            let n = CountRange::new(1, 2).sample(&mut rng);
            assert!((1..=2).contains(&n));
        }
        assert_eq!(CountRange::exactly(3).sample(&mut rng), 3);
        assert_eq!(CountRange::new(4, 1).sample(&mut rng), 4);
    }

    #[test]
    fn test_random_position_stays_inside() {
        let room = Room::new(0, Position::new(3, 4), 5, 2);
        let mut rng = create_rng(&GenerationConfig::new(3));
        for _ in 0..200 {
            assert!(room.contains(room.random_position(&mut rng)));
        }
    }
}
