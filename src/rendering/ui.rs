//! # User Interface Elements
//!
//! A bounded message log fed from session events, and a one-line status readout.

use crate::{ActorId, LevelSession, SessionEvent};
use std::collections::VecDeque;

/// Rolling history of human-readable event messages.
#[derive(Debug, Clone)]
pub struct MessageLog {
    messages: VecDeque<String>,
    /// Maximum number of messages to keep
    pub max_messages: usize,
}

impl MessageLog {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            max_messages,
        }
    }

    /// Adds a message, dropping the oldest once the log is full.
    pub fn add_message(&mut self, message: String) {
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    /// Adds the message for every event worth showing, told from `player`'s side.
    pub fn record(&mut self, events: &[SessionEvent], player: Option<ActorId>) {
        for message in events.iter().filter_map(|event| describe_event(event, player)) {
            self.add_message(message);
        }
    }

    /// The last `count` messages, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &str> {
        let skip = self.messages.len().saturating_sub(count);
        self.messages.iter().skip(skip).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Player-facing text for an event. Movement and bookkeeping events have none.
///
/// The player's own death is told by [`SessionEvent::PlayerDied`], so its
/// `ActorDied` stays silent.
pub fn describe_event(event: &SessionEvent, player: Option<ActorId>) -> Option<String> {
    let is_player = |id: &ActorId| Some(*id) == player;
    let message = match event {
        SessionEvent::LevelGenerated { level, enemies } => {
            format!("Level {}: {} enemies lurk here.", level, enemies)
        }
        SessionEvent::ActorAttacked { target, damage, .. } if is_player(target) => {
            format!("An enemy hits you for {}.", damage)
        }
        SessionEvent::ActorAttacked { damage, .. } => format!("You hit for {}.", damage),
        SessionEvent::ActorDied { actor, .. } if is_player(actor) => return None,
        SessionEvent::ActorDied { killer: None, .. } => "An enemy dies in a trap.".to_string(),
        SessionEvent::ActorDied { .. } => "An enemy falls.".to_string(),
        SessionEvent::TrapTriggered { actor, damage, .. } if is_player(actor) => {
            format!("A trap springs for {} damage!", damage)
        }
        SessionEvent::TrapTriggered { damage, .. } => {
            format!("An enemy springs a trap for {} damage.", damage)
        }
        SessionEvent::CoinCollected { amount, total } => {
            format!("Picked up {} gold ({} total).", amount, total)
        }
        SessionEvent::PotionConsumed { healed } => format!("The potion heals {}.", healed),
        SessionEvent::LevelComplete { level } => format!("Level {} cleared!", level),
        SessionEvent::PlayerDied => "You die...".to_string(),
        _ => return None,
    };
    Some(message)
}

/// One-line summary of the player's state.
pub fn render_status(session: &LevelSession) -> String {
    match session.player() {
        Some(player) => format!(
            "Level {} | HP {}/{} | Gold {} | Enemies {} | Turn {}",
            session.level(),
            player.health.max(0),
            player.effective_max_health(),
            player.wealth,
            session.living_enemies().count(),
            session.statistics().turns
        ),
        None => format!("Level {} | no player", session.level()),
    }
}
