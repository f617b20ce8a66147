//! # Delve
//!
//! Simulation core for a turn-based dungeon crawler.
//!
//! ## Architecture Overview
//!
//! Delve is the part of a dungeon crawler that decides things. Drawing, audio and
//! raw input polling live with the host; the core only exchanges plain data with them.
//!
//! - **Generation**: retry-based room-and-corridor layouts plus special tile placement
//! - **World queries**: walkability and occupancy against terrain and live actors
//! - **Combat and movement**: shared step resolution for the player and enemies
//! - **Enemy policy**: adjacent attack, otherwise a weighted greedy or random step
//! - **Turn scheduling**: a player turn followed by a counted barrier of enemy turns
//! - **Encounter rules**: traps, pickups and the exit, checked whenever a move lands
//!
//! A [`LevelSession`] owns all of the above for one level. The host calls
//! [`LevelSession::tick`] once per frame with the elapsed time and an [`InputSource`].

pub mod game;
pub mod generation;
pub mod input;
pub mod rendering;
pub mod utils;

// Core module re-exports
pub use game::*;
pub use generation::*;
pub use input::*;
pub use rendering::*;
pub use utils::*;

/// Core error type for the Delve simulation.
#[derive(thiserror::Error, Debug)]
pub enum DelveError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Level generation could not be completed
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Session state is invalid
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Action cannot be performed
    #[error("Invalid action: {0}")]
    InvalidAction(String),
}

/// Result type used throughout the Delve codebase.
pub type DelveResult<T> = Result<T, DelveError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation constants.
pub mod config {
    /// Default dungeon width in cells
    pub const DEFAULT_DUNGEON_WIDTH: u32 = 30;

    /// Default dungeon height in cells
    pub const DEFAULT_DUNGEON_HEIGHT: u32 = 30;

    /// Largest accepted grid side; keeps every cell addressable with `i32` coordinates
    pub const MAX_GRID_SIDE: u32 = 4096;

    /// Default number of rooms per level
    pub const DEFAULT_ROOM_COUNT: u32 = 4;

    /// Attempts allowed for a single special tile before it is abandoned
    pub const PLACEMENT_ATTEMPTS: u32 = 100;

    /// Items the player can carry besides what is equipped
    pub const INVENTORY_CAPACITY: usize = 6;

    /// Upper bound on state machine steps processed by a single tick
    pub const MAX_STEPS_PER_TICK: usize = 4096;
}
