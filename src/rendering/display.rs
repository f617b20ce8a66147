//! # ASCII Display
//!
//! Draws a level as text, one character per cell.

use crate::{Actor, ActorKind, Grid, SpecialTiles};

/// Renders terrain, then special tiles, then live actors on top.
///
/// Actors draw as `@` (player) and `E` (enemy). Dead actors are skipped so the tile
/// underneath shows through.
///
/// # Examples
///
/// ```
/// use delve::{render_ascii, CellKind, Grid, Position, SpecialTile, SpecialTiles};
///
/// let mut grid = Grid::new(3, 1);
/// grid.set(Position::new(1, 0), CellKind::Floor);
/// let mut tiles = SpecialTiles::new();
/// tiles.insert(Position::new(1, 0), SpecialTile::Coin);
///
/// assert_eq!(render_ascii(&grid, &tiles, &[]), " $ \n");
/// ```
pub fn render_ascii(grid: &Grid, placements: &SpecialTiles, actors: &[Actor]) -> String {
    let width = grid.width() as usize;
    let mut rows: Vec<Vec<char>> = grid
        .to_ascii()
        .lines()
        .map(|line| line.chars().collect())
        .collect();

    let mut paint = |x: i32, y: i32, glyph: char| {
        if x < 0 || y < 0 {
            return;
        }
        if let Some(cell) = rows.get_mut(y as usize).and_then(|row| row.get_mut(x as usize)) {
            *cell = glyph;
        }
    };

    for placement in placements.iter() {
        paint(placement.position.x, placement.position.y, placement.tile.glyph());
    }
    for actor in actors.iter().filter(|actor| actor.alive) {
        let glyph = match actor.kind {
            ActorKind::Player => '@',
            ActorKind::Enemy => 'E',
        };
        paint(actor.position.x, actor.position.y, glyph);
    }

    let mut out = String::with_capacity((width + 1) * rows.len());
    for row in rows {
        out.extend(row);
        out.push('\n');
    }
    out
}
