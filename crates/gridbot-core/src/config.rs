//! Configuration loading and typed config structures for the gridbot agent.
//!
//! The canonical configuration lives in `gridbot-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every field has a default, so an empty or missing file yields the
//! deployment configuration (5x5 grid, 500 ms sync poll, 100 ms motion tick).

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use gridbot_types::{Direction, GridPosition};
use gridbot_world::Grid;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid config: {message}")]
    Invalid {
        /// What is wrong with it.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level agent configuration.
///
/// Mirrors the structure of `gridbot-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AgentConfig {
    /// Grid dimensions.
    #[serde(default)]
    pub grid: GridConfig,

    /// Remote authority connection and poll rate.
    #[serde(default)]
    pub authority: AuthorityConfig,

    /// Decision policy parameters.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Heading and turn-signal behavior.
    #[serde(default)]
    pub heading: HeadingConfig,

    /// Line-following speeds and maneuver timings.
    #[serde(default)]
    pub motion: MotionConfig,

    /// Integer codes and slot counts of the wire encoding.
    #[serde(default)]
    pub wire: WireConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AgentConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `AUTHORITY_ADDR` overrides `authority.addr`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document carries no mapping at all.
        if yaml.trim().is_empty() {
            let mut config = Self::default();
            config.authority.apply_env_overrides();
            return Ok(config);
        }
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.authority.apply_env_overrides();
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Ok(grid) = Grid::new(self.grid.rows, self.grid.cols) else {
            return Err(invalid(format!(
                "grid must be at least 1x1, got {}x{}",
                self.grid.rows, self.grid.cols
            )));
        };
        if !grid.contains(self.policy.start) {
            return Err(invalid(format!(
                "policy.start {} is outside the grid",
                self.policy.start
            )));
        }
        let goal = self.policy.goal_cell(self.grid);
        if !grid.contains(goal) {
            return Err(invalid(format!("policy.goal {goal} is outside the grid")));
        }
        if self.policy.opponent_slot >= self.wire.player_slots {
            return Err(invalid(format!(
                "policy.opponent_slot {} needs at least {} player slots, wire has {}",
                self.policy.opponent_slot,
                self.policy.opponent_slot.saturating_add(1),
                self.wire.player_slots
            )));
        }
        if self.policy.decay_base == 0 {
            return Err(invalid("policy.decay_base must be positive".to_owned()));
        }
        if self.authority.poll_interval_ms == 0 {
            return Err(invalid("authority.poll_interval_ms must be positive".to_owned()));
        }
        if self.motion.tick_interval_ms == 0 {
            return Err(invalid("motion.tick_interval_ms must be positive".to_owned()));
        }
        let speeds = [
            self.motion.cruise_speed,
            self.motion.steer_speed,
            self.motion.turn_speed,
            self.motion.advance_speed,
        ];
        if let Some(speed) = speeds.iter().find(|&&s| s > MAX_SPEED) {
            return Err(invalid(format!(
                "motion speed {speed} exceeds the maximum of {MAX_SPEED}"
            )));
        }
        self.wire.validate_codes()
    }
}

const fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid { message }
}

/// Highest speed the motor driver accepts.
pub const MAX_SPEED: u8 = 100;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GridConfig {
    /// Number of rows.
    #[serde(default = "default_grid_dim")]
    pub rows: u16,

    /// Number of columns.
    #[serde(default = "default_grid_dim")]
    pub cols: u16,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: default_grid_dim(),
            cols: default_grid_dim(),
        }
    }
}

/// Remote authority connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorityConfig {
    /// `host:port` of the authority.
    #[serde(default = "default_authority_addr")]
    pub addr: String,

    /// Milliseconds between position checks in the sync loop.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl AuthorityConfig {
    /// Apply environment variable overrides for the authority address.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("AUTHORITY_ADDR") {
            self.addr = val;
        }
    }

    /// Poll interval as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            addr: default_authority_addr(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Decision policy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PolicyConfig {
    /// Cell where the start rule applies.
    #[serde(default)]
    pub start: GridPosition,

    /// Direction decided on the start cell.
    #[serde(default = "default_start_direction")]
    pub start_direction: Direction,

    /// Cell where the goal rule applies. Defaults to the bottom-right
    /// corner of the grid.
    #[serde(default)]
    pub goal: Option<GridPosition>,

    /// Direction decided on the goal cell.
    #[serde(default = "default_goal_direction")]
    pub goal_direction: Direction,

    /// Score subtracted for a hazard one step away, decayed like rewards
    /// further out.
    #[serde(default = "default_hazard_penalty")]
    pub hazard_penalty: u32,

    /// Each extra step of distance divides a cell's contribution by this.
    #[serde(default = "default_decay_base")]
    pub decay_base: u32,

    /// Player slot holding the opponent.
    #[serde(default = "default_opponent_slot")]
    pub opponent_slot: usize,
}

impl PolicyConfig {
    /// The goal cell, resolved against the grid dimensions.
    pub fn goal_cell(&self, grid: GridConfig) -> GridPosition {
        self.goal.unwrap_or_else(|| {
            GridPosition::new(
                i32::from(grid.rows.saturating_sub(1)),
                i32::from(grid.cols.saturating_sub(1)),
            )
        })
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            start: GridPosition::default(),
            start_direction: default_start_direction(),
            goal: None,
            goal_direction: default_goal_direction(),
            hazard_penalty: default_hazard_penalty(),
            decay_base: default_decay_base(),
            opponent_slot: default_opponent_slot(),
        }
    }
}

/// Heading and turn-signal behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HeadingConfig {
    /// Heading assumed before the first decision.
    #[serde(default = "default_initial_heading")]
    pub initial: Direction,

    /// Clear the pending turn signal once an intersection has executed it.
    ///
    /// Off by default: the signal stays pending until the next decision
    /// overwrites it and may be executed at several intersections.
    #[serde(default)]
    pub consume_once: bool,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_heading(),
            consume_once: false,
        }
    }
}

/// Line-following speeds (0-100) and maneuver timings (milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MotionConfig {
    /// Milliseconds between sensor reads.
    #[serde(default = "default_motion_tick_ms")]
    pub tick_interval_ms: u64,

    /// Speed of both sides when driving straight.
    #[serde(default = "default_cruise_speed")]
    pub cruise_speed: u8,

    /// Speed of both sides during a slight correction.
    #[serde(default = "default_steer_speed")]
    pub steer_speed: u8,

    /// Duration of a slight correction.
    #[serde(default = "default_steer_ms")]
    pub steer_ms: u64,

    /// Speed of both sides while rotating in place.
    #[serde(default = "default_turn_speed")]
    pub turn_speed: u8,

    /// Duration of each rotation of a quarter turn.
    #[serde(default = "default_turn_rotate_ms")]
    pub turn_rotate_ms: u64,

    /// Speed of the straight advance between the two quarter-turn rotations.
    #[serde(default = "default_advance_speed")]
    pub advance_speed: u8,

    /// Duration of that straight advance.
    #[serde(default = "default_advance_ms")]
    pub advance_ms: u64,

    /// Duration of the single rotation of a U-turn.
    #[serde(default = "default_u_turn_rotate_ms")]
    pub u_turn_rotate_ms: u64,

    /// Pause after each stop inside a maneuver.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl MotionConfig {
    /// Tick interval as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_motion_tick_ms(),
            cruise_speed: default_cruise_speed(),
            steer_speed: default_steer_speed(),
            steer_ms: default_steer_ms(),
            turn_speed: default_turn_speed(),
            turn_rotate_ms: default_turn_rotate_ms(),
            advance_speed: default_advance_speed(),
            advance_ms: default_advance_ms(),
            u_turn_rotate_ms: default_u_turn_rotate_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

/// Integer codes of the wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WireConfig {
    /// Code sent for [`ActionKind::Move`](gridbot_types::ActionKind::Move).
    #[serde(default = "default_action_move")]
    pub action_move: i32,

    /// Code sent for
    /// [`ActionKind::PlaceHazard`](gridbot_types::ActionKind::PlaceHazard).
    #[serde(default = "default_action_place_hazard")]
    pub action_place_hazard: i32,

    /// Status code of an empty cell.
    #[serde(default = "default_status_empty")]
    pub status_empty: i32,

    /// Status code of a reward cell.
    #[serde(default = "default_status_reward")]
    pub status_reward: i32,

    /// Status code of a hazard cell.
    #[serde(default = "default_status_hazard")]
    pub status_hazard: i32,

    /// Number of player records in every reply.
    #[serde(default = "default_player_slots")]
    pub player_slots: usize,
}

impl WireConfig {
    fn validate_codes(&self) -> Result<(), ConfigError> {
        if self.action_move == self.action_place_hazard {
            return Err(invalid(format!(
                "wire action codes must differ, both are {}",
                self.action_move
            )));
        }
        let statuses: BTreeSet<i32> = [self.status_empty, self.status_reward, self.status_hazard]
            .into_iter()
            .collect();
        if statuses.len() != 3 {
            return Err(invalid("wire cell status codes must be distinct".to_owned()));
        }
        Ok(())
    }
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            action_move: default_action_move(),
            action_place_hazard: default_action_place_hazard(),
            status_empty: default_status_empty(),
            status_reward: default_status_reward(),
            status_hazard: default_status_hazard(),
            player_slots: default_player_slots(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset (e.g. `info`, `gridbot_core=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit one JSON object per event instead of human-readable lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_grid_dim() -> u16 {
    5
}

fn default_authority_addr() -> String {
    "127.0.0.1:8080".to_owned()
}

const fn default_poll_interval_ms() -> u64 {
    500
}

const fn default_start_direction() -> Direction {
    Direction::Right
}

const fn default_goal_direction() -> Direction {
    Direction::Up
}

const fn default_hazard_penalty() -> u32 {
    8
}

const fn default_decay_base() -> u32 {
    3
}

const fn default_opponent_slot() -> usize {
    1
}

const fn default_initial_heading() -> Direction {
    Direction::Right
}

const fn default_motion_tick_ms() -> u64 {
    100
}

const fn default_cruise_speed() -> u8 {
    60
}

const fn default_steer_speed() -> u8 {
    50
}

const fn default_steer_ms() -> u64 {
    90
}

const fn default_turn_speed() -> u8 {
    80
}

const fn default_turn_rotate_ms() -> u64 {
    500
}

const fn default_advance_speed() -> u8 {
    50
}

const fn default_advance_ms() -> u64 {
    300
}

const fn default_u_turn_rotate_ms() -> u64 {
    1000
}

const fn default_settle_ms() -> u64 {
    50
}

const fn default_action_move() -> i32 {
    0
}

const fn default_action_place_hazard() -> i32 {
    1
}

const fn default_status_empty() -> i32 {
    0
}

const fn default_status_reward() -> i32 {
    1
}

const fn default_status_hazard() -> i32 {
    2
}

const fn default_player_slots() -> usize {
    2
}

fn default_log_level() -> String {
    "info".to_owned()
}
