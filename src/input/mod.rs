//! # Input Module
//!
//! Player intent sources. The session asks its [`InputSource`] for an intent once per
//! player turn and waits while the source has nothing to offer.

pub mod autoplay;
pub mod commands;

pub use autoplay::*;
pub use commands::*;

use crate::{DelveResult, Direction, LevelView};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A discrete decision for the player's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerIntent {
    /// Step (or attack) one cell in a direction
    Step(Direction),
    /// Pass the turn without moving
    Skip,
}

impl PlayerIntent {
    /// Maps a key to an intent.
    ///
    /// Accepts WASD, vi-style hjkl, and `f` or `.` to skip. Keys are case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Direction, PlayerIntent};
    ///
    /// assert_eq!(PlayerIntent::from_key('w'), Some(PlayerIntent::Step(Direction::North)));
    /// assert_eq!(PlayerIntent::from_key('L'), Some(PlayerIntent::Step(Direction::East)));
    /// assert_eq!(PlayerIntent::from_key('.'), Some(PlayerIntent::Skip));
    /// assert_eq!(PlayerIntent::from_key('q'), None);
    /// ```
    pub fn from_key(key: char) -> Option<PlayerIntent> {
        match key.to_ascii_lowercase() {
            'w' | 'k' => Some(PlayerIntent::Step(Direction::North)),
            's' | 'j' => Some(PlayerIntent::Step(Direction::South)),
            'a' | 'h' => Some(PlayerIntent::Step(Direction::West)),
            'd' | 'l' => Some(PlayerIntent::Step(Direction::East)),
            'f' | '.' => Some(PlayerIntent::Skip),
            _ => None,
        }
    }
}

/// Supplies player intents to a session.
pub trait InputSource {
    /// The intent for the current player turn, or None to keep waiting.
    fn next_intent(&mut self, level: &LevelView<'_>) -> Option<PlayerIntent>;
}

/// Replays a fixed list of intents, then waits forever.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedInput {
    intents: VecDeque<PlayerIntent>,
}

impl ScriptedInput {
    pub fn new(intents: impl IntoIterator<Item = PlayerIntent>) -> Self {
        Self {
            intents: intents.into_iter().collect(),
        }
    }

    /// Builds a script from a key string such as `"ddsf"`.
    pub fn from_script(script: &str) -> DelveResult<Self> {
        Ok(Self::new(parse_script(script)?))
    }

    /// Appends another intent to the end of the script.
    pub fn push(&mut self, intent: PlayerIntent) {
        self.intents.push_back(intent);
    }

    pub fn remaining(&self) -> usize {
        self.intents.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.intents.is_empty()
    }
}

impl InputSource for ScriptedInput {
    fn next_intent(&mut self, _level: &LevelView<'_>) -> Option<PlayerIntent> {
        self.intents.pop_front()
    }
}
