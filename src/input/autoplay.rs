//! # Autoplay
//!
//! A computer-controlled player for demos and soak tests: hunt down the closest enemy,
//! then walk to the exit.

use crate::{
    find_path, ActorKind, Direction, InputSource, LevelView, PlayerIntent, Position,
    SpecialTile, WorldQuery,
};

/// Path-following input source.
///
/// Routes avoid traps while any trap-free route exists. When nothing is reachable the
/// player skips its turn rather than stalling the session.
#[derive(Debug, Clone, Default)]
pub struct AutoplayInput {
    /// Where the last chosen route was heading
    pub target: Option<Position>,
}

impl AutoplayInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortest route from `start` to `goal`, preferring routes without traps.
    fn route(level: &LevelView<'_>, start: Position, goal: Position) -> Option<Vec<Position>> {
        let open = |pos: Position| level.is_walkable(pos);
        find_path(start, goal, |pos| {
            open(pos) && level.special_tile(pos) != Some(SpecialTile::Trap)
        })
        .or_else(|| find_path(start, goal, open))
    }
}

impl InputSource for AutoplayInput {
    fn next_intent(&mut self, level: &LevelView<'_>) -> Option<PlayerIntent> {
        let player = level
            .actors
            .iter()
            .find(|actor| actor.kind == ActorKind::Player && actor.alive)?;
        let start = player.position;

        let enemy_routes = level
            .actors
            .iter()
            .filter(|actor| actor.kind == ActorKind::Enemy && actor.alive)
            .filter_map(|enemy| Self::route(level, start, enemy.position));
        let route = enemy_routes.min_by_key(|path| path.len()).or_else(|| {
            level
                .placements
                .positions_of(SpecialTile::Exit)
                .into_iter()
                .filter_map(|exit| Self::route(level, start, exit))
                .min_by_key(|path| path.len())
        });

        let next = route.as_ref().and_then(|path| {
            self.target = path.last().copied();
            path.get(1).copied()
        });
        match next.and_then(|cell| Direction::from_delta(cell - start)) {
            Some(direction) => Some(PlayerIntent::Step(direction)),
            None => {
                log::debug!("Autoplay has no route from {:?}, skipping", start);
                Some(PlayerIntent::Skip)
            }
        }
    }
}
