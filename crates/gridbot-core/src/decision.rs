//! One-step lookahead direction choice.
//!
//! Given the latest world state and the agent's cell, the
//! [`DecisionEngine`] scores the four directions and picks the best legal
//! one, together with the [`ActionKind`] to commit on arrival.
//!
//! # Scoring
//!
//! A direction's score sums every cell in its half of the grid (strictly
//! above, below, left of or right of the agent). A reward contributes its
//! magnitude, a hazard contributes `-hazard_penalty`, and both are divided
//! by `decay_base^(d - 1)` where `d` is the Manhattan distance from the
//! agent.
//!
//! # Selection
//!
//! 1. On the start cell, return the configured start direction.
//! 2. On the goal cell, return the configured goal direction.
//! 3. Otherwise walk the directions best-first (ties in `Up, Down, Left,
//!    Right` order). Skip a direction whose destination is off the grid or
//!    adjacent to the opponent. Two steps from the opponent, choose it with
//!    [`ActionKind::PlaceHazard`]; anywhere else choose it with
//!    [`ActionKind::Move`].
//! 4. If every direction was skipped, fall back to the best-scoring one.

use std::cmp::Ordering;

use gridbot_types::{ActionKind, Cell, Direction, GridPosition};
use gridbot_world::WorldState;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{GridConfig, PolicyConfig};

/// Distance from the opponent at which a destination is never entered.
const OPPONENT_BLOCK_DISTANCE: u32 = 1;

/// Distance from the opponent at which a hazard is placed.
const OPPONENT_TRAP_DISTANCE: u32 = 2;

/// Score of a single direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionScore {
    /// The scored direction.
    pub direction: Direction,
    /// Decayed sum of the half-grid in that direction.
    pub score: f64,
}

/// Which selection rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    /// The agent is on the start cell.
    Start,
    /// The agent is on the goal cell.
    Goal,
    /// The best-ranked direction that passed the destination checks.
    Ranked,
    /// Every direction was skipped; the best-scoring one was taken anyway.
    Fallback,
}

/// Outcome of one decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    /// Chosen direction of travel.
    pub direction: Direction,
    /// Action to commit on the destination cell.
    pub kind: ActionKind,
    /// Rule that made the choice.
    pub rule: DecisionRule,
    /// All four directions, best first.
    pub ranking: Vec<DirectionScore>,
}

/// Scores directions and selects the next move.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    policy: PolicyConfig,
    goal: GridPosition,
}

impl DecisionEngine {
    /// Create an engine for the given policy on a grid of the given size.
    pub fn new(policy: PolicyConfig, grid: GridConfig) -> Self {
        Self {
            goal: policy.goal_cell(grid),
            policy,
        }
    }

    /// Score of `direction` as seen from `position`.
    pub fn score(&self, state: &WorldState, position: GridPosition, direction: Direction) -> f64 {
        state
            .grid()
            .iter()
            .filter(|&(cell_pos, _)| lies_toward(position, cell_pos, direction))
            .map(|(cell_pos, cell)| self.cell_value(cell, position.manhattan_distance(cell_pos)))
            // Start from +0.0 so an empty half-grid scores the same as a
            // half-grid of empty cells.
            .fold(0.0, |acc, value| acc + value)
    }

    /// All four directions ranked best first.
    ///
    /// The sort is stable, so equal scores keep `Up, Down, Left, Right`
    /// order.
    pub fn rank(&self, state: &WorldState, position: GridPosition) -> Vec<DirectionScore> {
        let mut ranking: Vec<DirectionScore> = Direction::ALL
            .iter()
            .map(|&direction| DirectionScore {
                direction,
                score: self.score(state, position, direction),
            })
            .collect();
        ranking.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranking
    }

    /// Choose the next direction and action from `position`.
    pub fn decide(&self, state: &WorldState, position: GridPosition) -> Decision {
        let ranking = self.rank(state, position);

        if position == self.policy.start {
            return Decision {
                direction: self.policy.start_direction,
                kind: ActionKind::Move,
                rule: DecisionRule::Start,
                ranking,
            };
        }
        if position == self.goal {
            return Decision {
                direction: self.policy.goal_direction,
                kind: ActionKind::Move,
                rule: DecisionRule::Goal,
                ranking,
            };
        }

        let opponent = state
            .player(self.policy.opponent_slot)
            .map(|player| player.position);

        for candidate in &ranking {
            let Some(destination) = position.step(candidate.direction) else {
                continue;
            };
            if !state.grid().contains(destination) {
                continue;
            }
            let kind = match opponent.map(|o| destination.manhattan_distance(o)) {
                Some(OPPONENT_BLOCK_DISTANCE) => continue,
                Some(OPPONENT_TRAP_DISTANCE) => ActionKind::PlaceHazard,
                _ => ActionKind::Move,
            };
            debug!(
                %position,
                %destination,
                direction = %candidate.direction,
                kind = %kind,
                score = candidate.score,
                "direction selected"
            );
            return Decision {
                direction: candidate.direction,
                kind,
                rule: DecisionRule::Ranked,
                ranking,
            };
        }

        let direction = ranking
            .first()
            .map_or(self.policy.start_direction, |best| best.direction);
        warn!(
            %position,
            opponent = ?opponent,
            direction = %direction,
            "every direction skipped, falling back to best score"
        );
        Decision {
            direction,
            kind: ActionKind::Move,
            rule: DecisionRule::Fallback,
            ranking,
        }
    }

    fn cell_value(&self, cell: Cell, distance: u32) -> f64 {
        let base = match cell {
            Cell::Empty => return 0.0,
            Cell::Reward { magnitude } => f64::from(magnitude),
            Cell::Hazard => -f64::from(self.policy.hazard_penalty),
        };
        let exponent = i32::try_from(distance.saturating_sub(1)).unwrap_or(i32::MAX);
        base / f64::from(self.policy.decay_base).powi(exponent)
    }
}

/// Whether `cell` lies strictly on the `direction` side of `from`.
const fn lies_toward(from: GridPosition, cell: GridPosition, direction: Direction) -> bool {
    match direction {
        Direction::Up => cell.row < from.row,
        Direction::Down => cell.row > from.row,
        Direction::Left => cell.col < from.col,
        Direction::Right => cell.col > from.col,
    }
}
