//! # Utilities Module
//!
//! Grid search helpers shared by generation, validation and autoplay.

pub mod search;

pub use search::*;
