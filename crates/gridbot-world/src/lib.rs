//! Grid model and world-state snapshots for the gridbot agent.
//!
//! This crate models the shared game world as last reported by the
//! authority: a fixed-size grid of cells plus the players' positions,
//! scores and remaining hazards.
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid and snapshot construction.
//! - [`grid`] -- [`Grid`], the fixed-size row-major cell array.
//! - [`snapshot`] -- [`WorldState`], an immutable grid + players snapshot.
//! - [`store`] -- [`WorldStateStore`], the single current snapshot with
//!   atomic replace.

pub mod error;
pub mod grid;
pub mod snapshot;
pub mod store;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use grid::Grid;
pub use snapshot::WorldState;
pub use store::WorldStateStore;
