use serde::{Deserialize, Serialize};

use crate::board::{Board, BOARD_SIZE, FLEET_SIZE};
use crate::error::EngineError;
use crate::geometry::{Ship, ShapeKind};

/// Persisted form of a board. Loading is format-validated only; a blob
/// that fails validation is rejected, never patched up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardRecord {
    pub id: u64,
    pub width: usize,
    pub height: usize,
    pub battleships: Vec<Ship>,
    pub discovered: Vec<(usize, usize)>,
    pub move_count: u32,
    pub avenger_available: bool,
}

impl Board {
    pub fn to_record(&self) -> BoardRecord {
        BoardRecord {
            id: self.id(),
            width: BOARD_SIZE,
            height: BOARD_SIZE,
            battleships: self.ships().to_vec(),
            discovered: self.discovered_cells(),
            move_count: self.move_count(),
            avenger_available: self.avenger_available(),
        }
    }

    pub fn from_record(record: BoardRecord) -> Result<Board, EngineError> {
        if record.width != BOARD_SIZE || record.height != BOARD_SIZE {
            return Err(EngineError::Data(format!(
                "bad board dimensions {}x{}",
                record.width, record.height
            )));
        }
        if record.battleships.len() != FLEET_SIZE {
            return Err(EngineError::Data(format!(
                "expected {} ships, found {}",
                FLEET_SIZE,
                record.battleships.len()
            )));
        }
        for kind in ShapeKind::ALL {
            if record.battleships.iter().filter(|s| s.shape == kind).count() != 1 {
                return Err(EngineError::Data(format!(
                    "fleet must contain exactly one {}",
                    kind.as_str()
                )));
            }
        }

        let mut board = Board::empty(record.id);
        for ship in &record.battleships {
            board.place(*ship).map_err(|_| {
                EngineError::Data(format!(
                    "illegal {} placement at ({}, {})",
                    ship.shape.as_str(),
                    ship.x,
                    ship.y
                ))
            })?;
        }

        for &(x, y) in &record.discovered {
            if x >= BOARD_SIZE || y >= BOARD_SIZE {
                return Err(EngineError::Data(format!(
                    "discovered cell ({x}, {y}) is off the board"
                )));
            }
        }
        let mut unique = record.discovered.clone();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() != record.discovered.len() {
            return Err(EngineError::Data("duplicate discovered cells".into()));
        }
        if record.move_count != record.discovered.len() as u32 {
            return Err(EngineError::Data(format!(
                "move_count {} does not match {} discovered cells",
                record.move_count,
                record.discovered.len()
            )));
        }

        board.restore_state(&record.discovered, record.move_count, record.avenger_available);
        Ok(board)
    }
}
