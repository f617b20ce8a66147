//! # World Representation
//!
//! The immutable cell grid of a level, the special tile placements layered on top of
//! it, and the [`WorldQuery`] seam that movement and policy code read through.

use crate::{config::MAX_GRID_SIDE, Actor, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kinds of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Unused space outside the carved layout
    Void,
    /// Walkable ground (rooms and corridors alike)
    Floor,
    /// Boundary produced by dilating the floor
    Wall,
}

impl CellKind {
    /// Whether actors can stand on this cell.
    pub fn is_walkable(self) -> bool {
        matches!(self, CellKind::Floor)
    }

    /// Character used for ASCII dumps.
    pub fn glyph(self) -> char {
        match self {
            CellKind::Void => ' ',
            CellKind::Floor => '.',
            CellKind::Wall => '#',
        }
    }
}

/// Fixed-size 2D grid of cells, stored row-major.
///
/// # Examples
///
/// ```
/// use delve::{CellKind, Grid, Position};
///
/// let mut grid = Grid::new(4, 3);
/// assert_eq!(grid.kind(Position::new(1, 1)), CellKind::Void);
/// grid.set(Position::new(1, 1), CellKind::Floor);
/// assert!(grid.kind(Position::new(1, 1)).is_walkable());
/// assert_eq!(grid.kind(Position::new(-1, 0)), CellKind::Void);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<CellKind>,
}

impl Grid {
    /// Creates a grid filled with [`CellKind::Void`].
    ///
    /// Each side is clamped to [`MAX_GRID_SIDE`](crate::config::MAX_GRID_SIDE).
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.min(MAX_GRID_SIDE);
        let height = height.min(MAX_GRID_SIDE);
        Self {
            width,
            height,
            cells: vec![CellKind::Void; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Checks whether a position lies inside the grid.
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Whether the position sits on the outermost ring of the grid.
    pub fn is_border(&self, pos: Position) -> bool {
        self.in_bounds(pos)
            && (pos.x == 0
                || pos.y == 0
                || pos.x as u32 == self.width - 1
                || pos.y as u32 == self.height - 1)
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    /// Gets the cell at a position, or None when out of bounds.
    pub fn get(&self, pos: Position) -> Option<CellKind> {
        self.index(pos).map(|index| self.cells[index])
    }

    /// Gets the cell at a position; out-of-bounds reads as Void.
    pub fn kind(&self, pos: Position) -> CellKind {
        self.get(pos).unwrap_or(CellKind::Void)
    }

    /// Sets a cell. Returns false (and does nothing) when out of bounds.
    pub fn set(&mut self, pos: Position, kind: CellKind) -> bool {
        match self.index(pos) {
            Some(index) => {
                self.cells[index] = kind;
                true
            }
            None => false,
        }
    }

    /// Iterates over every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Position::new(x, y)))
    }

    /// Collects every position holding the given kind.
    pub fn positions_of(&self, kind: CellKind) -> Vec<Position> {
        self.positions().filter(|&pos| self.kind(pos) == kind).collect()
    }

    /// Counts cells of the given kind.
    pub fn count(&self, kind: CellKind) -> usize {
        self.cells.iter().filter(|&&cell| cell == kind).count()
    }

    /// Renders the bare terrain, one line per row.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width as usize + 1) * self.height as usize);
        for row in self.cells.chunks(self.width.max(1) as usize) {
            out.extend(row.iter().map(|cell| cell.glyph()));
            out.push('\n');
        }
        out
    }
}

/// Gameplay tags attached to individual cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialTile {
    PlayerStart,
    EnemySpawn,
    Coin,
    Potion,
    Exit,
    Trap,
}

impl SpecialTile {
    /// Character used for ASCII dumps.
    pub fn glyph(self) -> char {
        match self {
            SpecialTile::PlayerStart => '<',
            SpecialTile::EnemySpawn => 'e',
            SpecialTile::Coin => '$',
            SpecialTile::Potion => '!',
            SpecialTile::Exit => '>',
            SpecialTile::Trap => '^',
        }
    }
}

/// One tagged coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Position,
    pub tile: SpecialTile,
}

/// Coordinate to tag mapping with at most one tag per coordinate.
///
/// Serialised as a list of [`Placement`]s since JSON maps need string keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Placement>", into = "Vec<Placement>")]
pub struct SpecialTiles {
    entries: BTreeMap<Position, SpecialTile>,
}

impl SpecialTiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags a coordinate. Refuses (returns false) if it is already tagged.
    pub fn insert(&mut self, position: Position, tile: SpecialTile) -> bool {
        if self.entries.contains_key(&position) {
            return false;
        }
        self.entries.insert(position, tile);
        true
    }

    pub fn get(&self, position: Position) -> Option<SpecialTile> {
        self.entries.get(&position).copied()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.entries.contains_key(&position)
    }

    /// Removes a tag, returning what was there.
    pub fn remove(&mut self, position: Position) -> Option<SpecialTile> {
        self.entries.remove(&position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All positions carrying the given tag, in row-major order.
    pub fn positions_of(&self, tile: SpecialTile) -> Vec<Position> {
        self.entries
            .iter()
            .filter(|(_, &tag)| tag == tile)
            .map(|(&pos, _)| pos)
            .collect()
    }

    /// The unique player start, if one was placed.
    pub fn player_start(&self) -> Option<Position> {
        self.positions_of(SpecialTile::PlayerStart).first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Placement> + '_ {
        self.entries
            .iter()
            .map(|(&position, &tile)| Placement { position, tile })
    }
}

impl From<Vec<Placement>> for SpecialTiles {
    fn from(placements: Vec<Placement>) -> Self {
        let mut tiles = SpecialTiles::new();
        for placement in placements {
            tiles.insert(placement.position, placement.tile);
        }
        tiles
    }
}

impl From<SpecialTiles> for Vec<Placement> {
    fn from(tiles: SpecialTiles) -> Self {
        tiles.iter().collect()
    }
}

/// Read-only questions movement and policy code ask about the current level.
pub trait WorldQuery {
    /// Terrain at a position; out of bounds reads as Void.
    fn cell(&self, pos: Position) -> CellKind;

    /// The live actor standing on a position, if any.
    fn actor_at(&self, pos: Position) -> Option<&Actor>;

    /// The special tile tag at a position, if any.
    fn special_tile(&self, pos: Position) -> Option<SpecialTile>;

    /// Walkable terrain with no live actor on it.
    fn is_walkable(&self, pos: Position) -> bool {
        self.cell(pos).is_walkable() && self.actor_at(pos).is_none()
    }
}

/// Borrowed view over the pieces of a level, usable wherever a [`WorldQuery`] is needed.
#[derive(Debug, Clone, Copy)]
pub struct LevelView<'a> {
    pub grid: &'a Grid,
    pub placements: &'a SpecialTiles,
    pub actors: &'a [Actor],
}

impl<'a> LevelView<'a> {
    pub fn new(grid: &'a Grid, placements: &'a SpecialTiles, actors: &'a [Actor]) -> Self {
        Self {
            grid,
            placements,
            actors,
        }
    }
}

impl WorldQuery for LevelView<'_> {
    fn cell(&self, pos: Position) -> CellKind {
        self.grid.kind(pos)
    }

    fn actor_at(&self, pos: Position) -> Option<&Actor> {
        self.actors
            .iter()
            .find(|actor| actor.alive && actor.position == pos)
    }

    fn special_tile(&self, pos: Position) -> Option<SpecialTile> {
        self.placements.get(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActorKind, ActorTemplate};

    #[test]
    fn test_grid_bounds_and_border() {
        let grid = Grid::new(5, 4);
        assert!(grid.in_bounds(Position::new(4, 3)));
        assert!(!grid.in_bounds(Position::new(5, 3)));
        assert!(grid.is_border(Position::new(0, 2)));
        assert!(grid.is_border(Position::new(4, 1)));
        assert!(!grid.is_border(Position::new(2, 2)));
        assert_eq!(grid.get(Position::new(9, 9)), None);
    }

    #[test]
    fn test_oversized_grid_is_clamped() {
        let grid = Grid::new(u32::MAX, 2);
        assert_eq!(grid.width(), MAX_GRID_SIDE);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.count(CellKind::Void), MAX_GRID_SIDE as usize * 2);
    }

    #[test]
    fn test_grid_counts_and_ascii() {
        let mut grid = Grid::new(3, 2);
        assert!(grid.set(Position::new(0, 0), CellKind::Wall));
        assert!(grid.set(Position::new(1, 0), CellKind::Floor));
        assert!(!grid.set(Position::new(3, 0), CellKind::Floor));

        assert_eq!(grid.count(CellKind::Void), 4);
        assert_eq!(grid.positions_of(CellKind::Floor), vec![Position::new(1, 0)]);
        assert_eq!(grid.to_ascii(), "#. \n   \n");
    }

    #[test]
    fn test_special_tiles_one_tag_per_cell() {
        let mut tiles = SpecialTiles::new();
        let pos = Position::new(2, 2);
        assert!(tiles.insert(pos, SpecialTile::Coin));
        assert!(!tiles.insert(pos, SpecialTile::Trap));
        assert_eq!(tiles.get(pos), Some(SpecialTile::Coin));
        assert_eq!(tiles.remove(pos), Some(SpecialTile::Coin));
        assert!(tiles.is_empty());
    }

    #[test]
    fn test_special_tiles_serialise_as_list() {
        let mut tiles = SpecialTiles::new();
        tiles.insert(Position::new(1, 1), SpecialTile::PlayerStart);
        tiles.insert(Position::new(4, 2), SpecialTile::Exit);

        let json = serde_json::to_string(&tiles).unwrap();
        assert!(json.starts_with('['));

        let loaded: SpecialTiles = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, tiles);
        assert_eq!(loaded.player_start(), Some(Position::new(1, 1)));
    }

    #[test]
    fn test_level_view_ignores_dead_actors() {
        let mut grid = Grid::new(4, 4);
        grid.set(Position::new(1, 1), CellKind::Floor);
        grid.set(Position::new(2, 1), CellKind::Floor);
        let tiles = SpecialTiles::new();

        let mut dead = ActorTemplate::default_enemy().spawn(ActorKind::Enemy, Position::new(2, 1));
        dead.alive = false;
        let live = ActorTemplate::default_enemy().spawn(ActorKind::Enemy, Position::new(1, 1));
        let actors = vec![dead, live];

        let view = LevelView::new(&grid, &tiles, &actors);
        assert!(view.is_walkable(Position::new(2, 1)));
        assert!(!view.is_walkable(Position::new(1, 1)));
        assert!(!view.is_walkable(Position::new(3, 1)));
    }
}
