//! Fixed-size binary encoding of the authority protocol (version 1).
//!
//! Every field is a little-endian two's-complement `int32`. There is no
//! framing beyond the fixed record sizes and no checksum.
//!
//! | Record        | Layout                                   | Size |
//! |---------------|------------------------------------------|------|
//! | Action        | `row, col, action_kind`                  | 12   |
//! | Cell          | `status, reward_magnitude`               | 8    |
//! | Player        | `row, col, score, bomb_count`            | 16   |
//! | World reply   | `rows * cols` cells, then `player_slots` players | varies |
//!
//! The integer codes for action kinds and cell statuses come from
//! [`WireConfig`].

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use gridbot_types::{ActionKind, ActionRecord, Cell, CellStatus, GridPosition, Player};
use gridbot_world::{Grid, WorldError, WorldState};

use crate::config::{GridConfig, WireConfig};

/// Size in bytes of an encoded action record.
pub const ACTION_RECORD_SIZE: usize = 12;

/// Size in bytes of one encoded cell.
pub const CELL_RECORD_SIZE: usize = 8;

/// Size in bytes of one encoded player.
pub const PLAYER_RECORD_SIZE: usize = 16;

/// Errors that can occur while encoding or decoding protocol records.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Reading or writing an integer failed (short buffer).
    #[error("wire I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The buffer is not exactly one record long.
    #[error("expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// A cell carried a status code outside the configured set.
    #[error("unknown cell status code {code} at cell {index}")]
    UnknownStatus {
        /// Row-major cell index.
        index: usize,
        /// The offending code.
        code: i32,
    },

    /// A reward cell carried a negative magnitude.
    #[error("negative reward magnitude {magnitude} at cell {index}")]
    NegativeReward {
        /// Row-major cell index.
        index: usize,
        /// The offending magnitude.
        magnitude: i32,
    },

    /// An action record carried an unknown kind code.
    #[error("unknown action kind code {code}")]
    UnknownActionKind {
        /// The offending code.
        code: i32,
    },

    /// The decoded values do not form a valid world state.
    #[error("invalid world state: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// A value does not fit its wire field.
    #[error("value out of range for wire field `{field}`")]
    OutOfRange {
        /// Name of the field.
        field: &'static str,
    },
}

/// Encoder/decoder for one grid size and code table.
#[derive(Debug, Clone, Copy)]
pub struct WireCodec {
    grid: GridConfig,
    codes: WireConfig,
}

impl WireCodec {
    /// Create a codec for the given grid dimensions and code table.
    pub const fn new(grid: GridConfig, codes: WireConfig) -> Self {
        Self { grid, codes }
    }

    /// Size in bytes of an encoded world-state reply.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::OutOfRange`] if the size overflows `usize`.
    pub fn reply_size(&self) -> Result<usize, WireError> {
        let cells = usize::from(self.grid.rows)
            .checked_mul(usize::from(self.grid.cols))
            .and_then(|n| n.checked_mul(CELL_RECORD_SIZE));
        let players = self.codes.player_slots.checked_mul(PLAYER_RECORD_SIZE);
        cells
            .zip(players)
            .and_then(|(c, p)| c.checked_add(p))
            .ok_or(WireError::OutOfRange {
                field: "reply_size",
            })
    }

    // -----------------------------------------------------------------------
    // Action records
    // -----------------------------------------------------------------------

    /// Encode the record sent to the authority.
    pub fn encode_action(&self, record: &ActionRecord) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::with_capacity(ACTION_RECORD_SIZE);
        out.write_i32::<LittleEndian>(record.position.row)?;
        out.write_i32::<LittleEndian>(record.position.col)?;
        out.write_i32::<LittleEndian>(self.action_code(record.kind))?;
        Ok(out)
    }

    /// Decode an action record, as the authority does.
    pub fn decode_action(&self, bytes: &[u8]) -> Result<ActionRecord, WireError> {
        expect_len(bytes, ACTION_RECORD_SIZE)?;
        let mut cur = Cursor::new(bytes);
        let row = cur.read_i32::<LittleEndian>()?;
        let col = cur.read_i32::<LittleEndian>()?;
        let code = cur.read_i32::<LittleEndian>()?;
        let kind = if code == self.codes.action_move {
            ActionKind::Move
        } else if code == self.codes.action_place_hazard {
            ActionKind::PlaceHazard
        } else {
            return Err(WireError::UnknownActionKind { code });
        };
        Ok(ActionRecord {
            position: GridPosition::new(row, col),
            kind,
        })
    }

    const fn action_code(&self, kind: ActionKind) -> i32 {
        match kind {
            ActionKind::Move => self.codes.action_move,
            ActionKind::PlaceHazard => self.codes.action_place_hazard,
        }
    }

    // -----------------------------------------------------------------------
    // World-state replies
    // -----------------------------------------------------------------------

    /// Decode a full world-state reply.
    ///
    /// Rejects unknown status codes, negative reward magnitudes and players
    /// outside the grid.
    pub fn decode_world_state(&self, bytes: &[u8]) -> Result<WorldState, WireError> {
        expect_len(bytes, self.reply_size()?)?;
        let mut cur = Cursor::new(bytes);

        let cell_count = usize::from(self.grid.rows)
            .checked_mul(usize::from(self.grid.cols))
            .ok_or(WireError::OutOfRange { field: "cells" })?;
        let mut cells = Vec::with_capacity(cell_count);
        for index in 0..cell_count {
            let code = cur.read_i32::<LittleEndian>()?;
            let magnitude = cur.read_i32::<LittleEndian>()?;
            cells.push(self.decode_cell(index, code, magnitude)?);
        }

        let mut players = Vec::with_capacity(self.codes.player_slots);
        for _ in 0..self.codes.player_slots {
            let row = cur.read_i32::<LittleEndian>()?;
            let col = cur.read_i32::<LittleEndian>()?;
            let score = cur.read_i32::<LittleEndian>()?;
            let bomb_count = cur.read_i32::<LittleEndian>()?;
            players.push(Player {
                position: GridPosition::new(row, col),
                score,
                bomb_count,
            });
        }

        let grid = Grid::from_cells(self.grid.rows, self.grid.cols, cells)?;
        Ok(WorldState::new(grid, players)?)
    }

    fn decode_cell(&self, index: usize, code: i32, magnitude: i32) -> Result<Cell, WireError> {
        match self.status_of(code) {
            Some(CellStatus::Empty) => Ok(Cell::Empty),
            Some(CellStatus::Hazard) => Ok(Cell::Hazard),
            Some(CellStatus::Reward) => {
                let Ok(magnitude) = u32::try_from(magnitude) else {
                    return Err(WireError::NegativeReward { index, magnitude });
                };
                Ok(Cell::Reward { magnitude })
            }
            None => Err(WireError::UnknownStatus { index, code }),
        }
    }

    fn status_of(&self, code: i32) -> Option<CellStatus> {
        if code == self.codes.status_empty {
            Some(CellStatus::Empty)
        } else if code == self.codes.status_hazard {
            Some(CellStatus::Hazard)
        } else if code == self.codes.status_reward {
            Some(CellStatus::Reward)
        } else {
            None
        }
    }

    const fn status_code(&self, status: CellStatus) -> i32 {
        match status {
            CellStatus::Empty => self.codes.status_empty,
            CellStatus::Reward => self.codes.status_reward,
            CellStatus::Hazard => self.codes.status_hazard,
        }
    }

    /// Encode a world-state reply, as the authority does.
    ///
    /// Emits exactly `player_slots` player records: missing slots are
    /// zero-filled and extra players are dropped.
    pub fn encode_world_state(&self, state: &WorldState) -> Result<Vec<u8>, WireError> {
        let grid = state.grid();
        if grid.rows() != self.grid.rows || grid.cols() != self.grid.cols {
            return Err(WireError::OutOfRange { field: "grid" });
        }
        let mut out = Vec::with_capacity(self.reply_size()?);
        for &cell in grid.cells() {
            let Ok(magnitude) = i32::try_from(cell.reward_magnitude()) else {
                return Err(WireError::OutOfRange {
                    field: "reward_magnitude",
                });
            };
            let code = self.status_code(cell.status());
            out.write_i32::<LittleEndian>(code)?;
            out.write_i32::<LittleEndian>(magnitude)?;
        }
        for slot in 0..self.codes.player_slots {
            let player = state.player(slot).copied().unwrap_or_default();
            out.write_i32::<LittleEndian>(player.position.row)?;
            out.write_i32::<LittleEndian>(player.position.col)?;
            out.write_i32::<LittleEndian>(player.score)?;
            out.write_i32::<LittleEndian>(player.bomb_count)?;
        }
        Ok(out)
    }
}

const fn expect_len(bytes: &[u8], expected: usize) -> Result<(), WireError> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(WireError::LengthMismatch {
            expected,
            actual: bytes.len(),
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;

    fn codec() -> WireCodec {
        WireCodec::new(GridConfig::default(), WireConfig::default())
    }

    fn push_i32s(out: &mut Vec<u8>, values: &[i32]) {
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    /// A 5x5 reply with a reward of 4 at (0, 1), a hazard at (2, 2) and the
    /// two players at (0, 0) and (4, 4).
    fn sample_reply() -> Vec<u8> {
        let mut out = Vec::new();
        for idx in 0..25 {
            match idx {
                1 => push_i32s(&mut out, &[1, 4]),
                12 => push_i32s(&mut out, &[2, 0]),
                _ => push_i32s(&mut out, &[0, 0]),
            }
        }
        push_i32s(&mut out, &[0, 0, 10, 2]);
        push_i32s(&mut out, &[4, 4, -3, 1]);
        out
    }

    #[test]
    fn sizes_follow_grid_and_slots() {
        let codec = codec();
        assert_eq!(codec.reply_size().unwrap(), 25 * 8 + 2 * 16);
    }

    #[test]
    fn action_is_little_endian_int32() {
        let record = ActionRecord {
            position: GridPosition::new(2, 3),
            kind: ActionKind::PlaceHazard,
        };
        let bytes = codec().encode_action(&record).unwrap();
        assert_eq!(bytes, vec![2, 0, 0, 0, 3, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn action_codes_are_configurable() {
        let codes = WireConfig {
            action_move: 7,
            ..WireConfig::default()
        };
        let codec = WireCodec::new(GridConfig::default(), codes);
        let record = ActionRecord {
            position: GridPosition::new(0, 0),
            kind: ActionKind::Move,
        };
        let bytes = codec.encode_action(&record).unwrap();
        assert_eq!(&bytes[8..], &[7, 0, 0, 0]);
        assert_eq!(codec.decode_action(&bytes).unwrap(), record);
    }

    #[test]
    fn status_codes_are_configurable() {
        let codes = WireConfig {
            status_empty: 10,
            status_reward: 20,
            status_hazard: 30,
            ..WireConfig::default()
        };
        let codec = WireCodec::new(GridConfig { rows: 1, cols: 3 }, codes);
        let grid = Grid::from_cells(
            1,
            3,
            vec![Cell::Empty, Cell::Reward { magnitude: 6 }, Cell::Hazard],
        )
        .unwrap();
        let state = WorldState::new(grid, Vec::new()).unwrap();

        let bytes = codec.encode_world_state(&state).unwrap();
        let mut expected = Vec::new();
        push_i32s(&mut expected, &[10, 0, 20, 6, 30, 0]);
        push_i32s(&mut expected, &[0; 8]);
        assert_eq!(bytes, expected);

        let decoded = codec.decode_world_state(&bytes).unwrap();
        assert_eq!(decoded.cell(GridPosition::new(0, 1)), Some(Cell::Reward { magnitude: 6 }));
        assert_eq!(decoded.cell(GridPosition::new(0, 2)), Some(Cell::Hazard));
    }

    #[test]
    fn decode_action_rejects_unknown_kind() {
        let mut bytes = Vec::new();
        push_i32s(&mut bytes, &[1, 1, 9]);
        assert!(matches!(
            codec().decode_action(&bytes),
            Err(WireError::UnknownActionKind { code: 9 })
        ));
    }

    #[test]
    fn decodes_sample_reply() {
        let state = codec().decode_world_state(&sample_reply()).unwrap();
        assert_eq!(
            state.cell(GridPosition::new(0, 1)),
            Some(Cell::Reward { magnitude: 4 })
        );
        assert_eq!(state.cell(GridPosition::new(2, 2)), Some(Cell::Hazard));
        assert_eq!(state.cell(GridPosition::new(3, 3)), Some(Cell::Empty));
        let opponent = state.player(1).unwrap();
        assert_eq!(opponent.position, GridPosition::new(4, 4));
        assert_eq!(opponent.score, -3);
        assert_eq!(state.player(0).unwrap().bomb_count, 2);
    }

    #[test]
    fn encoded_reply_decodes_to_same_state() {
        let codec = codec();
        let state = codec.decode_world_state(&sample_reply()).unwrap();
        assert_eq!(codec.encode_world_state(&state).unwrap(), sample_reply());
    }

    #[test]
    fn short_reply_rejected() {
        let mut reply = sample_reply();
        reply.pop();
        assert!(matches!(
            codec().decode_world_state(&reply),
            Err(WireError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn unknown_status_rejected() {
        let mut reply = sample_reply();
        // Cell 3 status.
        reply[24..28].copy_from_slice(&5_i32.to_le_bytes());
        assert!(matches!(
            codec().decode_world_state(&reply),
            Err(WireError::UnknownStatus { index: 3, code: 5 })
        ));
    }

    #[test]
    fn negative_reward_rejected() {
        let mut reply = sample_reply();
        // Cell 1 magnitude.
        reply[12..16].copy_from_slice(&(-1_i32).to_le_bytes());
        assert!(matches!(
            codec().decode_world_state(&reply),
            Err(WireError::NegativeReward { index: 1, magnitude: -1 })
        ));
    }

    #[test]
    fn player_off_grid_rejected() {
        let mut reply = sample_reply();
        // Opponent row.
        let offset = 25 * 8 + 16;
        reply[offset..offset + 4].copy_from_slice(&5_i32.to_le_bytes());
        assert!(matches!(
            codec().decode_world_state(&reply),
            Err(WireError::World {
                source: WorldError::PlayerOutOfBounds { slot: 1, .. }
            })
        ));
    }
}
