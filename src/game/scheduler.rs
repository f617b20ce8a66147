//! # Turn Scheduler
//!
//! State machine deciding whose turn it is. The player acts, its tile effects resolve,
//! then every enemy alive at that moment takes one turn in snapshot order. Control
//! returns to the player once the pending count reaches zero.
//!
//! Enemy completion is tracked with per-enemy status slots that the session polls,
//! rather than callbacks.

use crate::ActorId;
use serde::{Deserialize, Serialize};

/// Whose turn it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    /// Waiting for player input (initial state)
    PlayerTurn,
    /// The player's action landed and its tile effects are being resolved
    ResolvingTileEffects,
    /// Enemies are acting; `pending` have not yet finished
    EnemyTurnsInFlight { pending: u32 },
}

/// Progress of one enemy within the current enemy phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyTurnStatus {
    Queued,
    Acting,
    Done,
}

/// One enemy's slot in the dispatch snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyTurnSlot {
    pub enemy: ActorId,
    pub status: EnemyTurnStatus,
}

/// Signals produced by scheduler transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSignal {
    /// Control returned to the player
    PlayerTurnResumed,
    /// The enemy phase started with this many enemies
    EnemyPhaseStarted { enemies: u32 },
}

/// The turn barrier. Exactly one per level session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnScheduler {
    state: TurnState,
    slots: Vec<EnemyTurnSlot>,
    /// Completed enemy phases since the last reset
    round: u64,
    /// Double-completion signals detected and clamped
    desync_count: u32,
}

impl TurnScheduler {
    /// Creates a scheduler in [`TurnState::PlayerTurn`] with nothing pending.
    pub fn new() -> Self {
        Self {
            state: TurnState::PlayerTurn,
            slots: Vec::new(),
            round: 0,
            desync_count: 0,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_player_turn(&self) -> bool {
        self.state == TurnState::PlayerTurn
    }

    /// Enemies that have not finished their turn in the current phase.
    pub fn pending(&self) -> u32 {
        match self.state {
            TurnState::EnemyTurnsInFlight { pending } => pending,
            _ => 0,
        }
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn desync_count(&self) -> u32 {
        self.desync_count
    }

    pub fn slots(&self) -> &[EnemyTurnSlot] {
        &self.slots
    }

    /// The player's action has been committed; tile effects resolve once it lands.
    pub fn begin_tile_resolution(&mut self) {
        if self.state != TurnState::PlayerTurn {
            log::error!(
                "Tile resolution requested outside the player turn (state {:?})",
                self.state
            );
            return;
        }
        self.state = TurnState::ResolvingTileEffects;
    }

    /// Ends the player's turn with a snapshot of the living enemies, in dispatch order.
    ///
    /// The count is fixed here and is not recomputed while enemies act. With no living
    /// enemies control goes straight back to the player.
    pub fn end_player_turn(&mut self, living_enemies: &[ActorId]) -> TurnSignal {
        if matches!(self.state, TurnState::EnemyTurnsInFlight { .. }) {
            log::error!("Player turn ended while enemy turns were still in flight");
        }

        self.slots = living_enemies
            .iter()
            .map(|&enemy| EnemyTurnSlot {
                enemy,
                status: EnemyTurnStatus::Queued,
            })
            .collect();

        let enemies = self.slots.len() as u32;
        if enemies == 0 {
            log::debug!("No enemies, player turn resumed");
            return self.resume_player();
        }

        log::debug!("Starting enemy turns: {} enemies active", enemies);
        self.state = TurnState::EnemyTurnsInFlight { pending: enemies };
        TurnSignal::EnemyPhaseStarted { enemies }
    }

    /// The enemy currently acting, if one has been dispatched and not finished.
    pub fn acting(&self) -> Option<ActorId> {
        self.slots
            .iter()
            .find(|slot| slot.status == EnemyTurnStatus::Acting)
            .map(|slot| slot.enemy)
    }

    /// Marks the next queued enemy as acting and returns it.
    ///
    /// Enemies act one at a time: nothing is dispatched while another is still acting.
    pub fn dispatch_next(&mut self) -> Option<ActorId> {
        if !matches!(self.state, TurnState::EnemyTurnsInFlight { .. }) || self.acting().is_some()
        {
            return None;
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.status == EnemyTurnStatus::Queued)?;
        slot.status = EnemyTurnStatus::Acting;
        Some(slot.enemy)
    }

    /// Records that `enemy` finished its turn and decrements the pending count.
    ///
    /// Returns [`TurnSignal::PlayerTurnResumed`] exactly once, when the count hits zero.
    /// A completion that would drive the count below zero, or that repeats for an enemy
    /// already done, is a desync: it is logged, clamped and otherwise ignored.
    pub fn enemy_finished_turn(&mut self, enemy: ActorId) -> Option<TurnSignal> {
        let pending = match self.state {
            TurnState::EnemyTurnsInFlight { pending } => pending,
            state => {
                self.record_desync(format!(
                    "enemy {} finished a turn while no enemy turns were pending (state {:?})",
                    enemy, state
                ));
                return None;
            }
        };

        match self.slots.iter_mut().find(|slot| slot.enemy == enemy) {
            Some(slot) if slot.status == EnemyTurnStatus::Done => {
                self.record_desync(format!("enemy {} finished its turn twice", enemy));
                return None;
            }
            Some(slot) => slot.status = EnemyTurnStatus::Done,
            None => {
                self.record_desync(format!("enemy {} is not part of this enemy phase", enemy));
                return None;
            }
        }

        let remaining = pending.saturating_sub(1);
        log::debug!("Enemy finished turn, pending: {}", remaining);
        if remaining == 0 {
            self.round += 1;
            return Some(self.resume_player());
        }
        self.state = TurnState::EnemyTurnsInFlight { pending: remaining };
        None
    }

    /// Returns to [`TurnState::PlayerTurn`] with nothing pending.
    ///
    /// Called on level generation and restarts; in-flight enemy turns from the old
    /// level are discarded.
    pub fn reset(&mut self) {
        if matches!(self.state, TurnState::EnemyTurnsInFlight { .. }) {
            log::info!(
                "Discarding {} in-flight enemy turns on reset",
                self.pending()
            );
        }
        self.state = TurnState::PlayerTurn;
        self.slots.clear();
        self.round = 0;
    }

    fn resume_player(&mut self) -> TurnSignal {
        self.state = TurnState::PlayerTurn;
        self.slots.clear();
        TurnSignal::PlayerTurnResumed
    }

    fn record_desync(&mut self, detail: String) {
        self.desync_count += 1;
        log::error!("Turn desync: {}; pending count clamped to zero", detail);
        if !matches!(self.state, TurnState::EnemyTurnsInFlight { .. }) {
            return;
        }
        if self.slots.iter().all(|slot| slot.status == EnemyTurnStatus::Done) {
            self.resume_player();
        }
    }
}

impl Default for TurnScheduler {
    fn default() -> Self {
        Self::new()
    }
}
