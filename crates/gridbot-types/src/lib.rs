//! Shared type definitions for the gridbot agent.
//!
//! This crate is the single source of truth for the vocabulary shared by the
//! world model, the decision engine, the sync client and the motion
//! controller. It has no behavior beyond small geometric helpers.
//!
//! # Modules
//!
//! - [`enums`] -- Directions, turn signals, cell contents and action kinds
//! - [`structs`] -- Grid positions, players and action records

pub mod enums;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ActionKind, Cell, CellStatus, Direction, Heading, TurnSignal};
pub use structs::{ActionRecord, GridPosition, Player};
