//! # Enemy Policy
//!
//! Chooses what an enemy does with its turn: attack when orthogonally adjacent to the
//! player, otherwise roll between a greedy step toward the player and a random step.

use crate::{Actor, Direction, Position, WorldQuery};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default roll threshold. Rolls of 65..=100 step greedily, lower rolls wander.
pub const DEFAULT_GREEDY_THRESHOLD: u32 = 65;

/// An enemy's decision for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyAction {
    /// The player is orthogonally adjacent
    AttackPlayer,
    /// Step along the larger-magnitude axis toward the player
    StepToward {
        target: Position,
        direction: Direction,
    },
    /// Step in a uniformly chosen direction
    StepRandom(Direction),
}

impl EnemyAction {
    /// The direction the enemy will try to step in, if any.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            EnemyAction::AttackPlayer => None,
            EnemyAction::StepToward { direction, .. } => Some(*direction),
            EnemyAction::StepRandom(direction) => Some(*direction),
        }
    }
}

/// Decision-making seam for enemies.
pub trait EnemyPolicy {
    /// Decides the action `enemy` takes this turn.
    fn decide_action(
        &mut self,
        enemy: &Actor,
        player_pos: Position,
        world: &dyn WorldQuery,
        rng: &mut StdRng,
    ) -> EnemyAction;
}

/// The standard policy: adjacent attack, else a weighted greedy/random step.
///
/// A roll is drawn uniformly from `1..=100`; at or above `greedy_threshold` the enemy
/// closes in, below it the enemy wanders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreedyRandomPolicy {
    pub greedy_threshold: u32,
}

impl GreedyRandomPolicy {
    pub fn new(greedy_threshold: u32) -> Self {
        Self { greedy_threshold }
    }
}

impl Default for GreedyRandomPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_GREEDY_THRESHOLD)
    }
}

impl EnemyPolicy for GreedyRandomPolicy {
    fn decide_action(
        &mut self,
        enemy: &Actor,
        player_pos: Position,
        _world: &dyn WorldQuery,
        rng: &mut StdRng,
    ) -> EnemyAction {
        if enemy.position.is_orthogonally_adjacent(player_pos) {
            return EnemyAction::AttackPlayer;
        }

        let roll: u32 = rng.gen_range(1..=100);
        if roll >= self.greedy_threshold {
            if let Some(direction) = direction_toward(enemy.position, player_pos) {
                return EnemyAction::StepToward {
                    target: player_pos,
                    direction,
                };
            }
        }

        EnemyAction::StepRandom(random_direction(rng))
    }
}

/// One-cell step from `from` toward `to` along the axis with the larger delta.
///
/// Ties go to the x-axis. Returns None when the positions coincide.
///
/// # Examples
///
/// ```
/// use delve::{direction_toward, Direction, Position};
///
/// let from = Position::new(0, 0);
/// assert_eq!(direction_toward(from, Position::new(3, 1)), Some(Direction::East));
/// assert_eq!(direction_toward(from, Position::new(1, -4)), Some(Direction::North));
/// assert_eq!(direction_toward(from, Position::new(-2, 2)), Some(Direction::West));
/// ```
pub fn direction_toward(from: Position, to: Position) -> Option<Direction> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx == 0 && dy == 0 {
        return None;
    }
    if dx.abs() >= dy.abs() {
        Some(if dx > 0 { Direction::East } else { Direction::West })
    } else {
        Some(if dy > 0 { Direction::South } else { Direction::North })
    }
}

/// Uniformly picks one of the four orthogonal directions.
pub fn random_direction(rng: &mut StdRng) -> Direction {
    Direction::ALL[rng.gen_range(0..Direction::ALL.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActorKind, ActorTemplate, Grid, LevelView, SpecialTiles};
    use rand::SeedableRng;

    fn enemy_at(x: i32, y: i32) -> Actor {
        ActorTemplate::default_enemy().spawn(ActorKind::Enemy, Position::new(x, y))
    }

    #[test]
    fn test_adjacent_enemy_always_attacks() {
        let grid = Grid::new(8, 8);
        let tiles = SpecialTiles::new();
        let view = LevelView::new(&grid, &tiles, &[]);
        let mut rng = StdRng::seed_from_u64(1);
        let mut policy = GreedyRandomPolicy::default();

        let enemy = enemy_at(3, 3);
        for _ in 0..50 {
            assert_eq!(
                policy.decide_action(&enemy, Position::new(4, 3), &view, &mut rng),
                EnemyAction::AttackPlayer
            );
        }
    }

    #[test]
    fn test_diagonal_player_is_not_attacked() {
        let grid = Grid::new(8, 8);
        let tiles = SpecialTiles::new();
        let view = LevelView::new(&grid, &tiles, &[]);
        let mut rng = StdRng::seed_from_u64(2);
        let mut policy = GreedyRandomPolicy::default();

        let action = policy.decide_action(&enemy_at(3, 3), Position::new(4, 4), &view, &mut rng);
        assert_ne!(action, EnemyAction::AttackPlayer);
    }

    #[test]
    fn test_threshold_extremes() {
        let grid = Grid::new(8, 8);
        let tiles = SpecialTiles::new();
        let view = LevelView::new(&grid, &tiles, &[]);
        let mut rng = StdRng::seed_from_u64(3);
        let enemy = enemy_at(1, 1);
        let player = Position::new(6, 2);

        let mut always_greedy = GreedyRandomPolicy::new(1);
        let mut never_greedy = GreedyRandomPolicy::new(101);
        for _ in 0..50 {
            assert_eq!(
                always_greedy.decide_action(&enemy, player, &view, &mut rng),
                EnemyAction::StepToward {
                    target: player,
                    direction: Direction::East
                }
            );
            assert!(matches!(
                never_greedy.decide_action(&enemy, player, &view, &mut rng),
                EnemyAction::StepRandom(_)
            ));
        }
    }

    #[test]
    fn test_default_split_is_roughly_65_35() {
        let grid = Grid::new(8, 8);
        let tiles = SpecialTiles::new();
        let view = LevelView::new(&grid, &tiles, &[]);
        let mut rng = StdRng::seed_from_u64(4);
        let mut policy = GreedyRandomPolicy::default();
        let enemy = enemy_at(0, 0);

        let greedy = (0..10_000)
            .filter(|_| {
                matches!(
                    policy.decide_action(&enemy, Position::new(5, 5), &view, &mut rng),
                    EnemyAction::StepToward { .. }
                )
            })
            .count();
        // 36 of 100 rolls (65..=100) are greedy
        assert!((3_300..3_900).contains(&greedy), "greedy count {greedy}");
    }

    #[test]
    fn test_direction_toward_tie_prefers_x() {
        let from = Position::new(2, 2);
        assert_eq!(direction_toward(from, Position::new(4, 4)), Some(Direction::East));
        assert_eq!(direction_toward(from, Position::new(0, 0)), Some(Direction::West));
        assert_eq!(direction_toward(from, Position::new(2, 5)), Some(Direction::South));
        assert_eq!(direction_toward(from, from), None);
    }
}
