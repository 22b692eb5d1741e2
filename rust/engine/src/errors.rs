use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("Coordinates out of range: row {row}, col {col}")]
    OutOfBounds { row: usize, col: usize },
    #[error("Cell already occupied: row {row}, col {col}")]
    Occupied { row: usize, col: usize },
    #[error("Placement captures nothing: row {row}, col {col}")]
    NoCapture { row: usize, col: usize },
}
