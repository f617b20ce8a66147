//! # Rules Configuration
//!
//! Tunable gameplay numbers and the combined configuration file format.

use crate::{Actor, ActorKind, DelveResult, GenerationConfig, Position, DEFAULT_GREEDY_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Base stats an actor is spawned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorTemplate {
    pub max_health: i32,
    pub attack: i32,
    pub defense: i32,
}

impl ActorTemplate {
    pub fn default_player() -> Self {
        Self {
            max_health: 100,
            attack: 5,
            defense: 2,
        }
    }

    pub fn default_enemy() -> Self {
        Self {
            max_health: 10,
            attack: 10,
            defense: 1,
        }
    }

    /// Creates a fresh actor from this template.
    pub fn spawn(&self, kind: ActorKind, position: Position) -> Actor {
        Actor::new(kind, position, self.max_health, self.attack, self.defense)
    }
}

/// Gameplay rules shared by the session, encounter rules and enemy policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Damage dealt by a trap, applied without defense reduction
    pub trap_damage: i32,
    /// Wealth gained from a coin
    pub coin_value: u32,
    /// Health restored by a potion
    pub potion_heal: i32,
    /// Movement speed in cells per second
    pub move_speed: f32,
    /// Rolls (1..=100) at or above this step greedily toward the player
    pub greedy_threshold: u32,
    /// The player moves into the cell of an enemy it just killed
    pub advance_on_kill: bool,
    /// Enemies treat trap tiles as blocked
    pub enemies_avoid_traps: bool,
    pub player: ActorTemplate,
    pub enemy: ActorTemplate,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            trap_damage: 10,
            coin_value: 50,
            potion_heal: 30,
            move_speed: 5.0,
            greedy_threshold: DEFAULT_GREEDY_THRESHOLD,
            advance_on_kill: true,
            enemies_avoid_traps: true,
            player: ActorTemplate::default_player(),
            enemy: ActorTemplate::default_enemy(),
        }
    }
}

/// Everything a session needs, loadable from one JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub generation: GenerationConfig,
    pub rules: RulesConfig,
}

impl GameConfig {
    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> DelveResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Serialises the configuration as pretty JSON.
    pub fn to_json(&self) -> DelveResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
