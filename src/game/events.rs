//! # Session Events
//!
//! Everything observable that happens during a tick is reported as a [`SessionEvent`].
//! Hosts use the stream for presentation; [`GameStatistics`] folds it into totals.

use crate::{ActorId, Position, SpecialTile};
use serde::{Deserialize, Serialize};

/// Observable outcomes of simulation steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A new level was generated and populated
    LevelGenerated { level: u32, enemies: usize },
    /// An actor committed to a move (the animation may still be running)
    ActorMoved {
        actor: ActorId,
        from: Position,
        to: Position,
    },
    /// An actor's step was blocked and it stayed put
    ActorBlocked { actor: ActorId },
    /// The player skipped its turn
    PlayerSkipped,
    /// One actor hit another
    ActorAttacked {
        attacker: ActorId,
        target: ActorId,
        damage: i32,
    },
    /// An actor's health dropped to zero or below
    ActorDied { actor: ActorId, killer: Option<ActorId> },
    /// An actor stepped on a trap and was possibly thrown to another cell
    TrapTriggered {
        actor: ActorId,
        damage: i32,
        displaced_to: Option<Position>,
    },
    /// The player picked up a coin
    CoinCollected { amount: u32, total: u32 },
    /// The player drank a potion
    PotionConsumed { healed: i32 },
    /// A pickup tile was consumed and removed
    TileConsumed { position: Position, tile: SpecialTile },
    /// The player stands on the exit with every enemy dead
    LevelComplete { level: u32 },
    /// The player's health reached zero
    PlayerDied,
    /// All enemies finished and control returned to the player
    PlayerTurnResumed,
}

/// Running totals for the current run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatistics {
    /// Steps committed by the player
    pub steps_taken: u64,
    /// Damage the player dealt
    pub damage_dealt: u64,
    /// Damage the player took from enemies and traps
    pub damage_taken: u64,
    pub enemies_defeated: u32,
    pub coins_collected: u32,
    pub wealth: u32,
    pub potions_consumed: u32,
    pub traps_triggered: u32,
    pub levels_completed: u32,
    pub deaths: u32,
    /// Player turns completed
    pub turns: u64,
}

impl GameStatistics {
    /// Creates new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates statistics based on an event. `player` identifies the player actor.
    pub fn update_from_event(&mut self, event: &SessionEvent, player: Option<ActorId>) {
        let is_player = |id: &ActorId| Some(*id) == player;
        match event {
            SessionEvent::ActorMoved { actor, .. } if is_player(actor) => {
                self.steps_taken += 1;
            }
            SessionEvent::ActorAttacked {
                attacker,
                target,
                damage,
            } => {
                if is_player(attacker) {
                    self.damage_dealt += *damage as u64;
                } else if is_player(target) {
                    self.damage_taken += *damage as u64;
                }
            }
            SessionEvent::ActorDied { actor, killer } => {
                if is_player(actor) {
                    self.deaths += 1;
                } else if killer.as_ref().map_or(false, is_player) {
                    self.enemies_defeated += 1;
                }
            }
            SessionEvent::TrapTriggered { actor, damage, .. } if is_player(actor) => {
                self.traps_triggered += 1;
                self.damage_taken += *damage as u64;
            }
            SessionEvent::CoinCollected { amount, .. } => {
                self.coins_collected += 1;
                self.wealth += amount;
            }
            SessionEvent::PotionConsumed { .. } => {
                self.potions_consumed += 1;
            }
            SessionEvent::LevelComplete { .. } => {
                self.levels_completed += 1;
            }
            SessionEvent::PlayerTurnResumed => {
                self.turns += 1;
            }
            _ => {}
        }
    }
}
