//! # Actor Movement
//!
//! Resolves one intended step into a move, an attack or nothing. The resolver only
//! decides; applying damage and animating the move are the caller's job.

use crate::{resolve_attack, Actor, ActorId, Direction, Position, WorldQuery};
use serde::{Deserialize, Serialize};

/// What a single step attempt turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The target cell is free; the actor should move there
    Moved(Position),
    /// A live hostile actor stood in the target cell
    Attacked { target: ActorId, damage: i32 },
    /// Wall, void, or a non-hostile occupant
    Blocked,
}

/// Decides the outcome of `actor` stepping one cell in `direction`.
///
/// A live hostile occupant is attacked; any other occupant blocks, so enemies never
/// stack. Otherwise the terrain decides between a move and a block.
pub fn attempt_step(actor: &Actor, direction: Direction, world: &dyn WorldQuery) -> StepOutcome {
    let target = actor.position.step(direction);

    if let Some(occupant) = world.actor_at(target) {
        if occupant.id != actor.id && actor.is_hostile_to(occupant) {
            return StepOutcome::Attacked {
                target: occupant.id,
                damage: resolve_attack(actor.total_attack(), occupant.total_defense()),
            };
        }
        return StepOutcome::Blocked;
    }

    if world.cell(target).is_walkable() {
        StepOutcome::Moved(target)
    } else {
        StepOutcome::Blocked
    }
}
