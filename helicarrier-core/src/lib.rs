pub mod board;
pub mod error;
pub mod geometry;
pub mod persist;
pub mod protocol;

pub use board::{
    Avenger, AvengerReveal, Board, Shot, BOARD_SIZE, FLEET_SIZE, THOR_REVEAL_COUNT,
};
pub use error::EngineError;
pub use geometry::{Cell, Rotation, Shape, ShapeKind, Ship};
pub use persist::BoardRecord;
pub use protocol::{decode_grid, AvengerResult, FireResponse, MapPoint, GRID_CELLS};
