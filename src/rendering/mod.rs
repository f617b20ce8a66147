//! # Rendering Module
//!
//! Text stand-ins for the presentation layer: an ASCII map dump and a message log for
//! the headless binary. Real hosts draw from [`crate::LevelView`] themselves.

pub mod display;
pub mod ui;

pub use display::*;
pub use ui::*;
