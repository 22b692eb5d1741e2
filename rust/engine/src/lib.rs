//! # reversi-engine: Othello Board Rules Core
//!
//! A pure rules library for 8x8 Othello/Reversi. Provides move legality,
//! capture application, stalemate probing, and scoring over a flat board
//! representation. No I/O, no persistence, no clock: every operation is a
//! plain function of the board value.
//!
//! ## Core Modules
//!
//! - [`board`] - Board representation, sides, move application, scoring
//! - [`errors`] - Error types for rejected placements
//!
//! ## Quick Start
//!
//! ```rust
//! use reversi_engine::{Board, Side};
//!
//! let mut board = Board::new();
//! assert!(board.is_legal_move(2, 4, Side::Dark));
//!
//! // Placing at (2,4) captures the light stone at (3,4).
//! let flipped = board.apply_move(2, 4, Side::Dark).expect("legal opening move");
//! assert_eq!(flipped, 1);
//!
//! let score = board.score();
//! assert_eq!((score.dark, score.light), (4, 1));
//! ```

pub mod board;
pub mod errors;

pub use board::{Board, Score, Side, BOARD_SIZE};
pub use errors::BoardError;
