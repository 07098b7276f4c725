//! Decision, coordination and motion for the gridbot agent.
//!
//! This crate owns the three concurrent loops of a running agent and the
//! logic they share: position sync with the authority, the one-step
//! direction heuristic, heading/turn-signal tracking, and line following.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `gridbot-config.yaml` into
//!   strongly-typed structs.
//! - [`context`] -- [`AgentContext`], the shared state passed to every task.
//! - [`decision`] -- [`DecisionEngine`], direction scoring and selection.
//! - [`heading`] -- Turn-signal derivation and the shared heading tracker.
//! - [`motion`] -- Sensor classification, maneuvers and the motion loop.
//! - [`position`] -- [`PositionSource`] trait and floor-tag parsing.
//! - [`sync`] -- [`SyncClient`], the authority round-trip loop.
//! - [`wire`] -- Fixed-size little-endian protocol records.
//!
//! [`AgentContext`]: context::AgentContext
//! [`DecisionEngine`]: decision::DecisionEngine
//! [`PositionSource`]: position::PositionSource
//! [`SyncClient`]: sync::SyncClient

pub mod config;
pub mod context;
pub mod decision;
pub mod heading;
pub mod motion;
pub mod position;
pub mod sync;
pub mod wire;
