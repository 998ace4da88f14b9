use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use helicarrier_core::{ShapeKind, BOARD_SIZE};

/// Weight multiplier for placements that would extend a live hit. Dominates
/// every positional bias so wounded ships get finished first.
pub const TARGET_MODE_FACTOR: f64 = 100.0;

// Empirical multipliers from recorded reference games: fleets hug the left
// edge horizontally and the top edge vertically more often than a uniform
// placement would.
pub const EDGE_LEFT_HORIZONTAL_BIAS: f64 = 10.91 / 2.0;
pub const EDGE_TOP_VERTICAL_BIAS: f64 = 7.83 / 2.0;

/// Offline-computed scalar grids applied during heat synthesis. The
/// defaults are neutral (all ones); tuned tables load from JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BiasTables {
    /// Per-shape, per-cell multiplier, indexed `[shape][x][y]`.
    pub shape: [[[f64; BOARD_SIZE]; BOARD_SIZE]; ShapeKind::COUNT],
    /// Final per-cell multiplier on the synthesized heat.
    pub cell: [[f64; BOARD_SIZE]; BOARD_SIZE],
    pub edge_left_horizontal: f64,
    pub edge_top_vertical: f64,
}

impl Default for BiasTables {
    fn default() -> Self {
        BiasTables {
            shape: [[[1.0; BOARD_SIZE]; BOARD_SIZE]; ShapeKind::COUNT],
            cell: [[1.0; BOARD_SIZE]; BOARD_SIZE],
            edge_left_horizontal: EDGE_LEFT_HORIZONTAL_BIAS,
            edge_top_vertical: EDGE_TOP_VERTICAL_BIAS,
        }
    }
}

impl BiasTables {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let blob = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading bias tables {}", path.display()))?;
        serde_json::from_str(&blob)
            .with_context(|| format!("invalid bias tables {}", path.display()))
    }
}
