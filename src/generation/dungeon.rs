//! # Dungeon Generation
//!
//! Room-and-corridor layout generation.
//!
//! The generator:
//! 1. Places rooms at random with overlap rejection, bounded by an attempt cap
//! 2. Joins each room to the previous one with an L-shaped corridor
//! 3. Dilates the carved floor into a one-cell wall boundary
//! 4. Hands the layout to [`SpecialTilePlanner`] for tile placement
//! 5. Checks that every floor cell is reachable from the player start
//!
//! A layout that fails any step is discarded and regenerated from the same RNG stream,
//! up to [`GenerationConfig::max_generation_retries`] times.

use crate::{
    reachable_cells, CellKind, DungeonLayout, GenerationConfig, GenerationError, Generator,
    Grid, Position, Room, SpecialTilePlanner,
};
use rand::{rngs::StdRng, Rng};
use std::collections::BTreeSet;

/// Which leg of an L-shaped corridor is carved first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorridorElbow {
    HorizontalFirst,
    VerticalFirst,
}

/// Primary dungeon generator using the room-and-corridor algorithm.
#[derive(Debug, Clone, Default)]
pub struct RoomCorridorGenerator {
    planner: SpecialTilePlanner,
}

impl RoomCorridorGenerator {
    /// Creates a new dungeon generator.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{create_rng, GenerationConfig, Generator, RoomCorridorGenerator};
    ///
    /// let config = GenerationConfig::new(12345);
    /// let mut rng = create_rng(&config);
    /// let layout = RoomCorridorGenerator::new().generate(&config, &mut rng).unwrap();
    /// assert!(layout.player_start().is_some());
    /// ```
    pub fn new() -> Self {
        Self {
            planner: SpecialTilePlanner::new(),
        }
    }

    /// Places `num_rooms` non-overlapping rooms.
    ///
    /// Each room gets `max_room_attempts` candidates; running out aborts this layout.
    fn place_rooms(
        &self,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> Result<Vec<Room>, GenerationError> {
        let mut rooms: Vec<Room> = Vec::with_capacity(config.num_rooms as usize);

        for room_id in 0..config.num_rooms {
            let placed = (0..config.max_room_attempts)
                .map(|_| self.generate_room_candidate(config, rng, room_id))
                .find(|candidate| !rooms.iter().any(|existing| candidate.overlaps(existing)));

            match placed {
                Some(room) => rooms.push(room),
                None => {
                    return Err(GenerationError::infeasible(
                        format!(
                            "room {} did not fit after {} candidates",
                            room_id, config.max_room_attempts
                        ),
                        1,
                    ))
                }
            }
        }

        Ok(rooms)
    }

    /// Samples a room that fits inside the grid's border margin.
    fn generate_room_candidate(
        &self,
        config: &GenerationConfig,
        rng: &mut StdRng,
        room_id: u32,
    ) -> Room {
        let width = rng.gen_range(config.room_min_size..=config.room_max_size);
        let height = rng.gen_range(config.room_min_size..=config.room_max_size);

        let x = rng.gen_range(1..(config.width as i32 - width as i32 - 1));
        let y = rng.gen_range(1..(config.height as i32 - height as i32 - 1));

        Room::new(room_id, Position::new(x, y), width, height)
    }

    /// Carves out a room in the grid by setting every cell to floor.
    fn carve_room(&self, grid: &mut Grid, room: &Room) {
        for pos in room.all_positions() {
            grid.set(pos, CellKind::Floor);
        }
    }

    /// Joins each room to its predecessor between their centers.
    fn connect_rooms(
        &self,
        grid: &mut Grid,
        rooms: &mut [Room],
        rng: &mut StdRng,
    ) -> BTreeSet<Position> {
        let mut corridors = BTreeSet::new();

        for i in 1..rooms.len() {
            let start = rooms[i - 1].center();
            let end = rooms[i].center();
            let elbow = if rng.gen_bool(0.5) {
                CorridorElbow::HorizontalFirst
            } else {
                CorridorElbow::VerticalFirst
            };

            for pos in l_corridor(start, end, elbow) {
                if grid.set(pos, CellKind::Floor) {
                    corridors.insert(pos);
                }
            }

            let (previous, current) = (rooms[i - 1].id, rooms[i].id);
            rooms[i - 1].add_connection(current);
            rooms[i].add_connection(previous);
        }

        corridors
    }

    /// Surrounds every floor cell with walls over its 8-neighbourhood.
    fn dilate_walls(&self, grid: &mut Grid) {
        for pos in grid.positions_of(CellKind::Floor) {
            for neighbour in pos.surrounding_positions() {
                if grid.get(neighbour) == Some(CellKind::Void) {
                    grid.set(neighbour, CellKind::Wall);
                }
            }
        }
    }

    /// One full layout attempt.
    fn try_generate(
        &self,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> Result<DungeonLayout, GenerationError> {
        let mut rooms = self.place_rooms(config, rng)?;

        let mut grid = Grid::new(config.width, config.height);
        for room in &rooms {
            self.carve_room(&mut grid, room);
        }
        let corridors = self.connect_rooms(&mut grid, &mut rooms, rng);
        self.dilate_walls(&mut grid);

        let (placements, soft_failures) =
            self.planner.place(&grid, &rooms, &corridors, config, rng)?;

        let layout = DungeonLayout {
            grid,
            placements,
            rooms,
            corridors,
            soft_failures,
        };
        self.validate(&layout, config)?;
        Ok(layout)
    }
}

impl Generator<DungeonLayout> for RoomCorridorGenerator {
    fn generate(
        &self,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> Result<DungeonLayout, GenerationError> {
        config.validate()?;

        let mut last_error = None;
        for attempt in 1..=config.max_generation_retries {
            match self.try_generate(config, rng) {
                Ok(layout) => {
                    for failure in &layout.soft_failures {
                        log::warn!(
                            "Could not place {:?} in room {} after {} attempts",
                            failure.tile,
                            failure.room,
                            failure.attempts
                        );
                    }
                    log::info!(
                        "Generated {}x{} level on attempt {}: {} rooms, {} floor, {} wall, {} special tiles",
                        config.width,
                        config.height,
                        attempt,
                        layout.rooms.len(),
                        layout.grid.count(CellKind::Floor),
                        layout.grid.count(CellKind::Wall),
                        layout.placements.len()
                    );
                    return Ok(layout);
                }
                Err(error) => {
                    log::debug!("Layout attempt {} discarded: {}", attempt, error);
                    last_error = Some(error);
                }
            }
        }

        let reason = match last_error {
            Some(GenerationError::Infeasible { reason, .. }) => reason,
            Some(other) => other.to_string(),
            None => "no attempts were made".to_string(),
        };
        Err(GenerationError::infeasible(
            reason,
            config.max_generation_retries,
        ))
    }

    fn validate(
        &self,
        layout: &DungeonLayout,
        _config: &GenerationConfig,
    ) -> Result<(), GenerationError> {
        let start = layout
            .player_start()
            .ok_or_else(|| GenerationError::infeasible("no player start was placed", 1))?;

        let grid = &layout.grid;
        let reachable = reachable_cells(start, |pos| grid.kind(pos).is_walkable());
        let floor = grid.count(CellKind::Floor);
        if reachable.len() < floor {
            return Err(GenerationError::Disconnected {
                unreachable: floor - reachable.len(),
            });
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "RoomCorridorGenerator"
    }
}

/// Cells of an L-shaped corridor from `start` to `end`, both ends included.
pub fn l_corridor(start: Position, end: Position, elbow: CorridorElbow) -> Vec<Position> {
    let corner = match elbow {
        CorridorElbow::HorizontalFirst => Position::new(end.x, start.y),
        CorridorElbow::VerticalFirst => Position::new(start.x, end.y),
    };
    let mut cells = straight_line(start, corner);
    cells.extend(straight_line(corner, end).into_iter().skip(1));
    cells
}

/// Axis-aligned segment from `from` to `to`, both ends included.
fn straight_line(from: Position, to: Position) -> Vec<Position> {
    let step = Position::new((to.x - from.x).signum(), (to.y - from.y).signum());
    let mut cells = vec![from];
    let mut current = from;
    while current != to {
        current = current + step;
        cells.push(current);
    }
    cells
}
