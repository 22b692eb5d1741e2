use crate::errors::BoardError;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const BOARD_SIZE: usize = 8;
const BOARD_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// The 8 ray directions scanned for captures from a placed stone.
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// One of the two players, encoded as a signed unit cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Dark,
    Light,
}

impl Side {
    /// Cell encoding: Dark stones are `1`, Light stones are `-1`.
    pub fn value(self) -> i8 {
        match self {
            Side::Dark => 1,
            Side::Light => -1,
        }
    }

    pub fn opponent(self) -> Side {
        match self {
            Side::Dark => Side::Light,
            Side::Light => Side::Dark,
        }
    }

    pub fn from_value(value: i8) -> Option<Side> {
        match value {
            1 => Some(Side::Dark),
            -1 => Some(Side::Light),
            _ => None,
        }
    }
}

/// Stone tally for reporting. Never consulted for move legality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub dark: u8,
    pub light: u8,
}

/// An 8x8 Othello board.
///
/// Cells are a flat array indexed by `row * 8 + col`, each holding `1`
/// (dark), `-1` (light) or `0` (empty). The wire form is the nested
/// `[[i8; 8]; 8]` grid of those values, validated on deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [i8; BOARD_CELLS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Creates the canonical opening position: dark on the main diagonal
    /// center cells (3,3) and (4,4), light on (3,4) and (4,3).
    pub fn new() -> Self {
        let mut cells = [0i8; BOARD_CELLS];
        cells[Self::index(3, 3)] = 1;
        cells[Self::index(4, 4)] = 1;
        cells[Self::index(3, 4)] = -1;
        cells[Self::index(4, 3)] = -1;
        Self { cells }
    }

    /// Builds a board from an explicit grid. Intended for restoring
    /// persisted positions and for constructing test fixtures.
    pub fn from_rows(rows: [[i8; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        let mut cells = [0i8; BOARD_CELLS];
        for (r, row) in rows.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                cells[Self::index(r, c)] = value;
            }
        }
        Self { cells }
    }

    fn index(row: usize, col: usize) -> usize {
        row * BOARD_SIZE + col
    }

    fn on_board(row: i32, col: i32) -> bool {
        (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col)
    }

    /// Returns the cell value at (row, col), or `None` off the board.
    pub fn cell(&self, row: usize, col: usize) -> Option<i8> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Some(self.cells[Self::index(row, col)])
        } else {
            None
        }
    }

    /// Length of the capture run from (row, col) along one direction:
    /// the number of contiguous opponent stones immediately followed by a
    /// stone of `side`. Returns 0 when the ray hits an empty cell or the
    /// board edge first. Bounded walk, at most 7 steps.
    fn capture_run(&self, row: usize, col: usize, dir: (i32, i32), side: Side) -> usize {
        let own = side.value();
        let opponent = side.opponent().value();
        let mut run = 0;
        let mut r = row as i32 + dir.0;
        let mut c = col as i32 + dir.1;
        while Self::on_board(r, c) {
            let value = self.cells[Self::index(r as usize, c as usize)];
            if value == opponent {
                run += 1;
            } else if value == own {
                return run;
            } else {
                return 0;
            }
            r += dir.0;
            c += dir.1;
        }
        0
    }

    /// True iff (row, col) is an empty on-board cell and placing `side`
    /// there captures at least one opponent stone.
    pub fn is_legal_move(&self, row: usize, col: usize, side: Side) -> bool {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return false;
        }
        if self.cells[Self::index(row, col)] != 0 {
            return false;
        }
        DIRECTIONS
            .iter()
            .any(|&dir| self.capture_run(row, col, dir, side) > 0)
    }

    /// Places a stone of `side` at (row, col) and flips every qualifying
    /// capture run. Eligibility is computed against the pre-move board and
    /// then committed in one pass, so a run that is only valid before any
    /// flipping still counts. Returns the number of flipped stones.
    pub fn apply_move(&mut self, row: usize, col: usize, side: Side) -> Result<usize, BoardError> {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return Err(BoardError::OutOfBounds { row, col });
        }
        if self.cells[Self::index(row, col)] != 0 {
            return Err(BoardError::Occupied { row, col });
        }

        // Snapshot run lengths per direction before touching any cell.
        let mut runs = [0usize; DIRECTIONS.len()];
        for (i, &dir) in DIRECTIONS.iter().enumerate() {
            runs[i] = self.capture_run(row, col, dir, side);
        }
        let flipped: usize = runs.iter().sum();
        if flipped == 0 {
            return Err(BoardError::NoCapture { row, col });
        }

        self.cells[Self::index(row, col)] = side.value();
        for (i, &dir) in DIRECTIONS.iter().enumerate() {
            let mut r = row as i32;
            let mut c = col as i32;
            for _ in 0..runs[i] {
                r += dir.0;
                c += dir.1;
                let idx = Self::index(r as usize, c as usize);
                self.cells[idx] = -self.cells[idx];
            }
        }
        Ok(flipped)
    }

    /// True iff `side` has at least one legal placement anywhere.
    pub fn any_legal_move(&self, side: Side) -> bool {
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                if self.is_legal_move(row, col, side) {
                    return true;
                }
            }
        }
        false
    }

    /// Counts stones per side.
    pub fn score(&self) -> Score {
        let mut score = Score { dark: 0, light: 0 };
        for &cell in &self.cells {
            if cell == 1 {
                score.dark += 1;
            } else if cell == -1 {
                score.light += 1;
            }
        }
        score
    }
}

impl Serialize for Board {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut rows = [[0i8; BOARD_SIZE]; BOARD_SIZE];
        for (i, row) in rows.iter_mut().enumerate() {
            row.copy_from_slice(&self.cells[i * BOARD_SIZE..(i + 1) * BOARD_SIZE]);
        }
        rows.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rows = Vec::<Vec<i8>>::deserialize(deserializer)?;
        if rows.len() != BOARD_SIZE {
            return Err(DeError::invalid_length(rows.len(), &"8 rows of 8 cells"));
        }
        let mut cells = [0i8; BOARD_CELLS];
        for (r, row) in rows.iter().enumerate() {
            if row.len() != BOARD_SIZE {
                return Err(DeError::invalid_length(row.len(), &"8 cells per row"));
            }
            for (c, &value) in row.iter().enumerate() {
                if !(-1..=1).contains(&value) {
                    return Err(DeError::custom(format!(
                        "cell value out of range at ({r},{c}): {value}"
                    )));
                }
                cells[Board::index(r, c)] = value;
            }
        }
        Ok(Board { cells })
    }
}
