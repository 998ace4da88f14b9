use serde::{Deserialize, Serialize};

use crate::board::{AvengerReveal, BOARD_SIZE};
use crate::error::EngineError;
use crate::geometry::Cell;

pub const GRID_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// Response body for every fire-family route.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireResponse {
    /// 144 chars of `*` / `X` / `.`, row-major (index = y * 12 + x).
    pub grid: String,
    /// `"."` / `"X"` for the fired cell, `""` on a status call.
    pub cell: String,
    /// True iff the shot consumed a previously unknown cell.
    pub result: bool,
    pub avenger_available: bool,
    pub map_id: u64,
    /// Maps remaining in the current game.
    pub map_count: u32,
    pub move_count: u32,
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avenger_result: Option<Vec<AvengerResult>>,
}

/// Wire-side point. The axes are flipped relative to the engine: `x`
/// carries the row (engine y) and `y` the column (engine x).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: usize,
    pub y: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvengerResult {
    pub map_point: MapPoint,
    pub hit: bool,
}

impl AvengerResult {
    pub fn from_reveal(reveal: AvengerReveal) -> Self {
        AvengerResult {
            map_point: MapPoint {
                x: reveal.y,
                y: reveal.x,
            },
            hit: reveal.hit,
        }
    }

    /// Engine-side (x, y) of this result, undoing the wire flip.
    pub fn engine_xy(&self) -> (usize, usize) {
        (self.map_point.y, self.map_point.x)
    }
}

/// Parse a 144-char grid string into per-cell values, column-first indexed
/// as `grid[x][y]`.
pub fn decode_grid(grid: &str) -> Result<[[Cell; BOARD_SIZE]; BOARD_SIZE], EngineError> {
    let chars: Vec<char> = grid.chars().collect();
    if chars.len() != GRID_CELLS {
        return Err(EngineError::Data(format!(
            "grid string has {} cells, expected {GRID_CELLS}",
            chars.len()
        )));
    }
    let mut out = [[Cell::Unknown; BOARD_SIZE]; BOARD_SIZE];
    for y in 0..BOARD_SIZE {
        for x in 0..BOARD_SIZE {
            let c = chars[y * BOARD_SIZE + x];
            out[x][y] = Cell::from_wire(c)
                .ok_or_else(|| EngineError::Data(format!("bad grid char: {c:?}")))?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_codec_is_row_major() {
        let mut grid = "*".repeat(GRID_CELLS);
        // Mark engine cell (3, 1): index 1 * 12 + 3.
        grid.replace_range(15..16, "X");
        let cells = decode_grid(&grid).unwrap();
        assert_eq!(cells[3][1], Cell::Ship);
        assert_eq!(cells[1][3], Cell::Unknown);
    }

    #[test]
    fn grid_codec_rejects_bad_input() {
        assert!(decode_grid("*").is_err());
        let bad = "?".repeat(GRID_CELLS);
        assert!(decode_grid(&bad).is_err());
    }

    #[test]
    fn avenger_result_flips_axes() {
        let reveal = AvengerReveal {
            x: 2,
            y: 9,
            hit: true,
        };
        let result = AvengerResult::from_reveal(reveal);
        assert_eq!(result.map_point.x, 9, "mapPoint.x carries the row");
        assert_eq!(result.map_point.y, 2, "mapPoint.y carries the column");
        assert_eq!(result.engine_xy(), (2, 9));
    }

    #[test]
    fn response_uses_camel_case_keys() {
        let response = FireResponse {
            grid: "*".repeat(GRID_CELLS),
            cell: "X".to_string(),
            result: true,
            avenger_available: true,
            map_id: 3,
            map_count: 197,
            move_count: 12,
            finished: false,
            avenger_result: Some(vec![AvengerResult {
                map_point: MapPoint { x: 1, y: 2 },
                hit: false,
            }]),
        };
        let json = serde_json::to_string(&response).unwrap();
        for key in [
            "\"avengerAvailable\"",
            "\"mapId\"",
            "\"mapCount\"",
            "\"moveCount\"",
            "\"finished\"",
            "\"avengerResult\"",
            "\"mapPoint\"",
        ] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
        let back: FireResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.map_count, 197);
    }

    #[test]
    fn avenger_result_is_omitted_when_absent() {
        let response = FireResponse {
            grid: "*".repeat(GRID_CELLS),
            cell: String::new(),
            result: false,
            avenger_available: false,
            map_id: 1,
            map_count: 200,
            move_count: 0,
            finished: false,
            avenger_result: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("avengerResult"));
    }
}
