use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("coordinates ({x}, {y}) are off the board")]
    OutOfBounds { x: i32, y: i32 },

    #[error("no avenger is available")]
    AvengerUnavailable,

    #[error("placement conflicts with an existing ship or the board edge")]
    PlacementConflict,

    #[error("corrupt board data: {0}")]
    Data(String),

    #[error("engine invariant violated: {0}")]
    Fatal(String),
}
