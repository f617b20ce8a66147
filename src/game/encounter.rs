//! # Encounter Rules
//!
//! Tile effects applied when an actor finishes moving into a cell, and the exit check
//! that decides when a level is complete.

use crate::{
    random_direction, Actor, ActorKind, Grid, LevelView, Position, RulesConfig, SessionEvent,
    SpecialTile, SpecialTiles, WorldQuery,
};
use rand::rngs::StdRng;

/// Resolves special tile effects for landed actors.
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterRules {
    pub trap_damage: i32,
    pub coin_value: u32,
    pub potion_heal: i32,
}

impl EncounterRules {
    pub fn new(trap_damage: i32, coin_value: u32, potion_heal: i32) -> Self {
        Self {
            trap_damage,
            coin_value,
            potion_heal,
        }
    }

    pub fn from_rules(rules: &RulesConfig) -> Self {
        Self::new(rules.trap_damage, rules.coin_value, rules.potion_heal)
    }

    /// Applies the effect of the tile under `actors[index]`.
    ///
    /// At most one effect fires per call; a trap displacement does not trigger the tile
    /// it lands on. Coins and potions are single-use and only the player collects them.
    pub fn resolve(
        &self,
        index: usize,
        actors: &mut [Actor],
        grid: &Grid,
        placements: &mut SpecialTiles,
        level: u32,
        rng: &mut StdRng,
    ) -> Vec<SessionEvent> {
        let Some(actor) = actors.get(index) else {
            log::warn!("Tile effect requested for unknown actor slot {}", index);
            return Vec::new();
        };
        if !actor.alive {
            return Vec::new();
        }
        let position = actor.position;
        let is_player = actor.kind == ActorKind::Player;

        match placements.get(position) {
            Some(SpecialTile::Exit) if is_player => self
                .check_exit(actors, placements, position, level)
                .into_iter()
                .collect(),
            Some(SpecialTile::Trap) => self.trigger_trap(index, actors, grid, placements, rng),
            Some(tile @ SpecialTile::Coin) if is_player => {
                placements.remove(position);
                let actor = &mut actors[index];
                actor.wealth += self.coin_value;
                log::debug!(
                    "Player picked up a coin, total wealth {}",
                    actor.wealth
                );
                vec![
                    SessionEvent::CoinCollected {
                        amount: self.coin_value,
                        total: actor.wealth,
                    },
                    SessionEvent::TileConsumed { position, tile },
                ]
            }
            Some(tile @ SpecialTile::Potion) if is_player => {
                placements.remove(position);
                let healed = actors[index].heal(self.potion_heal);
                log::debug!("Player drank a potion, healed {}", healed);
                vec![
                    SessionEvent::PotionConsumed { healed },
                    SessionEvent::TileConsumed { position, tile },
                ]
            }
            _ => Vec::new(),
        }
    }

    /// Signals level completion if `position` is the exit and every enemy is dead.
    ///
    /// Has no side effects, so repeated calls with enemies alive never complete the level.
    pub fn check_exit(
        &self,
        actors: &[Actor],
        placements: &SpecialTiles,
        position: Position,
        level: u32,
    ) -> Option<SessionEvent> {
        if placements.get(position) != Some(SpecialTile::Exit) {
            return None;
        }
        if all_enemies_dead(actors) {
            log::info!("Player reached the open exit on level {}", level);
            Some(SessionEvent::LevelComplete { level })
        } else {
            log::debug!("Exit is closed: some enemies are still alive");
            None
        }
    }

    fn trigger_trap(
        &self,
        index: usize,
        actors: &mut [Actor],
        grid: &Grid,
        placements: &SpecialTiles,
        rng: &mut StdRng,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let id = actors[index].id;
        let died = actors[index].take_damage(self.trap_damage);

        let displaced_to = if died {
            None
        } else {
            let from = actors[index].position;
            let first = random_direction(rng);
            let view = LevelView::new(grid, placements, actors);
            let landing = [first, first.opposite()]
                .into_iter()
                .map(|direction| from.step(direction))
                .find(|&candidate| view.is_walkable(candidate));
            if let Some(to) = landing {
                actors[index].begin_move(to);
                events.push(SessionEvent::ActorMoved {
                    actor: id,
                    from,
                    to,
                });
            } else {
                log::debug!("Trap jump blocked both ways, actor {} stays put", id);
            }
            landing
        };

        log::debug!(
            "Actor {} triggered a trap for {} damage, displaced to {:?}",
            id,
            self.trap_damage,
            displaced_to
        );
        events.insert(
            0,
            SessionEvent::TrapTriggered {
                actor: id,
                damage: self.trap_damage,
                displaced_to,
            },
        );
        if died {
            events.push(SessionEvent::ActorDied {
                actor: id,
                killer: None,
            });
        }
        events
    }
}

impl Default for EncounterRules {
    fn default() -> Self {
        Self::from_rules(&RulesConfig::default())
    }
}

/// True when no enemy is left alive.
pub fn all_enemies_dead(actors: &[Actor]) -> bool {
    actors
        .iter()
        .filter(|actor| actor.kind == ActorKind::Enemy)
        .all(|actor| !actor.alive)
}
