//! # Special Tile Placement
//!
//! Tags cells of a carved layout with the player start, the exit, enemy spawns, pickups
//! and traps.
//!
//! Every tile is placed by rejection sampling inside its room: a random cell is accepted
//! if it is floor, not carved by a corridor and not already tagged. Traps additionally
//! keep away from corridor cells. The player start and the exit are mandatory: running
//! out of attempts for either fails the layout so the generator retries. Any other tile
//! that runs out of attempts is recorded as a [`SoftPlacementFailure`] and skipped.

use crate::{
    GenerationConfig, GenerationError, Grid, Position, Room, SoftPlacementFailure, SpecialTile,
    SpecialTiles,
};
use rand::{rngs::StdRng, Rng};
use std::collections::BTreeSet;

/// Places special tiles onto a generated grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecialTilePlanner;

impl SpecialTilePlanner {
    pub fn new() -> Self {
        Self
    }

    /// Places every special tile for a layout.
    ///
    /// Fails when the player start cannot be placed in the first room or the exit cannot
    /// be placed in its room; every other shortfall is reported in the returned failure list.
    pub fn place(
        &self,
        grid: &Grid,
        rooms: &[Room],
        corridors: &BTreeSet<Position>,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> Result<(SpecialTiles, Vec<SoftPlacementFailure>), GenerationError> {
        let first = rooms
            .first()
            .ok_or_else(|| GenerationError::infeasible("no rooms to place tiles in", 1))?;

        let mut placer = TilePlacer {
            grid,
            corridors,
            attempts: config.placement_attempts,
            tiles: SpecialTiles::new(),
            failures: Vec::new(),
        };

        if !placer.place_in_room(first, SpecialTile::PlayerStart, rng) {
            return Err(GenerationError::infeasible(
                format!(
                    "no free floor for the player start in room {} after {} attempts",
                    first.id, config.placement_attempts
                ),
                1,
            ));
        }

        let exit_room = if rooms.len() > 1 {
            &rooms[rng.gen_range(1..rooms.len())]
        } else {
            first
        };
        if !placer.place_in_room(exit_room, SpecialTile::Exit, rng) {
            return Err(GenerationError::infeasible(
                format!(
                    "no free floor for the exit in room {} after {} attempts",
                    exit_room.id, config.placement_attempts
                ),
                1,
            ));
        }

        for room in rooms {
            let counts = config
                .placement
                .counts(room.size_class(config.small_room_max));

            for _ in 0..counts.enemies.sample(rng) {
                placer.place_in_room(room, SpecialTile::EnemySpawn, rng);
            }
            if rng.gen_bool(config.placement.coin_chance) {
                placer.place_in_room(room, SpecialTile::Coin, rng);
            }
            if rng.gen_bool(config.placement.potion_chance) {
                placer.place_in_room(room, SpecialTile::Potion, rng);
            }
            for _ in 0..counts.traps.sample(rng) {
                placer.place_in_room(room, SpecialTile::Trap, rng);
            }
        }

        Ok((placer.tiles, placer.failures))
    }
}

/// Placement state for one layout.
struct TilePlacer<'a> {
    grid: &'a Grid,
    corridors: &'a BTreeSet<Position>,
    attempts: u32,
    tiles: SpecialTiles,
    failures: Vec<SoftPlacementFailure>,
}

impl TilePlacer<'_> {
    /// Tries up to `attempts` random cells of `room`. Returns false on a soft failure.
    fn place_in_room(&mut self, room: &Room, tile: SpecialTile, rng: &mut StdRng) -> bool {
        for _ in 0..self.attempts {
            let pos = room.random_position(rng);
            if self.accepts(pos, tile) {
                self.tiles.insert(pos, tile);
                return true;
            }
        }

        self.failures.push(SoftPlacementFailure {
            room: room.id,
            tile,
            attempts: self.attempts,
        });
        false
    }

    fn accepts(&self, pos: Position, tile: SpecialTile) -> bool {
        if !self.grid.kind(pos).is_walkable()
            || self.corridors.contains(&pos)
            || self.tiles.contains(pos)
        {
            return false;
        }
        tile != SpecialTile::Trap || !is_adjacent_to_corridor(pos, self.corridors)
    }
}

/// Whether any orthogonal neighbour of `pos` was carved by a corridor.
pub fn is_adjacent_to_corridor(pos: Position, corridors: &BTreeSet<Position>) -> bool {
    pos.orthogonal_neighbours()
        .iter()
        .any(|neighbour| corridors.contains(neighbour))
}
