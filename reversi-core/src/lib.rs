//! Reversi (Othello) rules engine with bit-based board representation.
//!
//! # Board Encoding (2 × 64-bit)
//!
//! ```text
//! One occupancy mask per side. Bit i is set when that side owns square i.
//! The two masks never overlap; a square set in neither is empty.
//!
//! Square indices (row-major order):
//!   (0,0)=0   (0,1)=1  ...  (0,7)=7
//!   (1,0)=8   (1,1)=9  ...  (1,7)=15
//!   ...
//!   (7,0)=56  (7,1)=57 ...  (7,7)=63
//! ```
//!
//! `Board` is `Copy`. Every rules operation takes a board by value or
//! reference and returns a new one, so a board held by an older
//! [`GameState`] is never changed by a later move.

pub mod game;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use game::{GameState, MoveError, Winner};

/// Board edge length.
pub const BOARD_SIZE: u8 = 8;
/// Number of squares on the board.
pub const NUM_SQUARES: u8 = BOARD_SIZE * BOARD_SIZE;

/// The 8 scan directions as (row delta, col delta).
const DIRECTIONS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// One of the two competing sides. Black moves first.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Black,
    White,
}

impl Side {
    /// Get the opposing side.
    #[inline]
    pub fn opponent(self) -> Side {
        match self {
            Side::Black => Side::White,
            Side::White => Side::Black,
        }
    }

    /// Both sides in slot order.
    pub fn all() -> impl Iterator<Item = Side> {
        [Side::Black, Side::White].into_iter()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Black => f.write_str("black"),
            Side::White => f.write_str("white"),
        }
    }
}

/// Content of a single square.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Cell {
    Empty,
    Black,
    White,
}

impl Cell {
    /// The owning side, or None for an empty square.
    #[inline]
    pub fn side(self) -> Option<Side> {
        match self {
            Cell::Empty => None,
            Cell::Black => Some(Side::Black),
            Cell::White => Some(Side::White),
        }
    }
}

impl From<Side> for Cell {
    fn from(side: Side) -> Cell {
        match side {
            Side::Black => Cell::Black,
            Side::White => Cell::White,
        }
    }
}

/// Position on the 8x8 board (0-63).
///
/// A `Pos` is always in bounds; build one from untrusted coordinates with
/// [`Pos::new`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct Pos(u8);

impl Pos {
    /// Create a position from row and column, or None if either is outside 0-7.
    #[inline]
    pub fn new(row: i64, col: i64) -> Option<Pos> {
        let size = i64::from(BOARD_SIZE);
        if (0..size).contains(&row) && (0..size).contains(&col) {
            Some(Pos((row * size + col) as u8))
        } else {
            None
        }
    }

    /// Create a position from row and column (0-7 each).
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is 8 or more. Use [`Pos::new`] for untrusted
    /// input.
    #[inline]
    pub fn from_row_col(row: u8, col: u8) -> Pos {
        assert!(
            row < BOARD_SIZE && col < BOARD_SIZE,
            "square ({row},{col}) is off the board"
        );
        Pos(row * BOARD_SIZE + col)
    }

    /// Square index (0-63).
    #[inline]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Get the row (0-7).
    #[inline]
    pub fn row(self) -> u8 {
        self.0 / BOARD_SIZE
    }

    /// Get the column (0-7).
    #[inline]
    pub fn col(self) -> u8 {
        self.0 % BOARD_SIZE
    }

    /// Single-bit mask for this square.
    #[inline]
    pub fn bit(self) -> u64 {
        1u64 << self.0
    }

    /// Step one square in a direction, or None when that leaves the board.
    #[inline]
    fn offset(self, dr: i8, dc: i8) -> Option<Pos> {
        Pos::new(
            i64::from(self.row()) + i64::from(dr),
            i64::from(self.col()) + i64::from(dc),
        )
    }

    /// Iterate over all 64 positions in row-major order.
    pub fn all() -> impl Iterator<Item = Pos> {
        (0..NUM_SQUARES).map(Pos)
    }

    /// Positions of the set bits in a mask, in row-major order.
    pub fn from_mask(mut mask: u64) -> impl Iterator<Item = Pos> {
        std::iter::from_fn(move || {
            if mask == 0 {
                return None;
            }
            let index = mask.trailing_zeros() as u8;
            mask &= mask - 1;
            Some(Pos(index))
        })
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row(), self.col())
    }
}

/// Error returned by [`Board::from_rows`] for an unrecognized square character.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid board character {ch:?} at ({row},{col})")]
pub struct ParseBoardError {
    pub row: u8,
    pub col: u8,
    pub ch: char,
}

/// Compact board state: one occupancy mask per side.
///
/// See module documentation for encoding details.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Board {
    black: u64,
    white: u64,
}

impl Board {
    /// Create the standard opening position.
    ///
    /// White on (3,3) and (4,4), Black on (3,4) and (4,3).
    pub fn new() -> Board {
        Board {
            black: Pos::from_row_col(3, 4).bit() | Pos::from_row_col(4, 3).bit(),
            white: Pos::from_row_col(3, 3).bit() | Pos::from_row_col(4, 4).bit(),
        }
    }

    /// Create a board with no pieces.
    #[inline]
    pub fn empty() -> Board {
        Board { black: 0, white: 0 }
    }

    /// Create a board from raw masks. Returns None if the masks overlap.
    pub fn from_masks(black: u64, white: u64) -> Option<Board> {
        (black & white == 0).then_some(Board { black, white })
    }

    /// Parse a board from 8 rows of `.`, `B` and `W` (whitespace ignored).
    pub fn from_rows(rows: &[&str; 8]) -> Result<Board, ParseBoardError> {
        let mut board = Board::empty();
        for (row, line) in rows.iter().enumerate() {
            let squares = line.chars().filter(|c| !c.is_whitespace());
            for (col, ch) in squares.enumerate() {
                let err = ParseBoardError { row: row as u8, col: col as u8, ch };
                let pos = Pos::new(row as i64, col as i64).ok_or(err.clone())?;
                let cell = match ch {
                    '.' => Cell::Empty,
                    'B' | 'b' => Cell::Black,
                    'W' | 'w' => Cell::White,
                    _ => return Err(err),
                };
                board = board.with_cell(pos, cell);
            }
        }
        Ok(board)
    }

    /// Occupancy mask for one side.
    #[inline]
    pub fn mask(&self, side: Side) -> u64 {
        match side {
            Side::Black => self.black,
            Side::White => self.white,
        }
    }

    /// Mask of every occupied square.
    #[inline]
    pub fn occupied(&self) -> u64 {
        self.black | self.white
    }

    /// Get the content of a square.
    #[inline]
    pub fn cell(&self, pos: Pos) -> Cell {
        let bit = pos.bit();
        if self.black & bit != 0 {
            Cell::Black
        } else if self.white & bit != 0 {
            Cell::White
        } else {
            Cell::Empty
        }
    }

    /// Check if a square is empty.
    #[inline]
    pub fn is_empty(&self, pos: Pos) -> bool {
        self.occupied() & pos.bit() == 0
    }

    /// Return a copy of this board with one square overwritten.
    /// Does NOT apply any flips.
    #[inline]
    pub fn with_cell(self, pos: Pos, cell: Cell) -> Board {
        let bit = pos.bit();
        let (mut black, mut white) = (self.black & !bit, self.white & !bit);
        match cell {
            Cell::Empty => {}
            Cell::Black => black |= bit,
            Cell::White => white |= bit,
        }
        Board { black, white }
    }

    // ========== Captures ==========

    /// Squares that would flip if `side` played at `pos`.
    ///
    /// The union over all 8 directions of every contiguous opposing run that
    /// is closed by a `side` piece. Zero for an occupied square.
    pub fn flips(&self, pos: Pos, side: Side) -> u64 {
        if !self.is_empty(pos) {
            return 0;
        }

        let me = self.mask(side);
        let opp = self.mask(side.opponent());
        let mut flips = 0u64;

        for (dr, dc) in DIRECTIONS {
            let mut line = 0u64;
            let mut cursor = pos.offset(dr, dc);

            while let Some(p) = cursor {
                let bit = p.bit();
                if opp & bit != 0 {
                    line |= bit;
                    cursor = p.offset(dr, dc);
                } else {
                    // Run closed by our own piece; an empty square ends it unflipped.
                    if me & bit != 0 {
                        flips |= line;
                    }
                    break;
                }
            }
        }

        flips
    }

    /// Check whether `side` may play at `pos`: the square is empty and at
    /// least one opposing piece flips.
    #[inline]
    pub fn is_legal_move(&self, pos: Pos, side: Side) -> bool {
        self.flips(pos, side) != 0
    }

    /// Legal moves for `side` as a bitmask.
    pub fn legal_mask(&self, side: Side) -> u64 {
        let empty = !self.occupied();
        Pos::from_mask(empty)
            .filter(|&pos| self.is_legal_move(pos, side))
            .fold(0u64, |acc, pos| acc | pos.bit())
    }

    /// Legal moves for `side` in row-major order. Empty if there are none.
    pub fn legal_moves(&self, side: Side) -> Vec<Pos> {
        Pos::from_mask(self.legal_mask(side)).collect()
    }

    /// Check whether `side` has any legal move.
    #[inline]
    pub fn has_legal_move(&self, side: Side) -> bool {
        self.legal_mask(side) != 0
    }

    /// Place a `side` piece at `pos` and flip every captured run.
    ///
    /// An illegal placement (occupied square or nothing captured) returns the
    /// board unchanged, so the two masks never overlap.
    pub fn apply_move(&self, pos: Pos, side: Side) -> Board {
        let flips = self.flips(pos, side);
        if flips == 0 {
            return *self;
        }

        let gained = flips | pos.bit();
        match side {
            Side::Black => Board {
                black: self.black | gained,
                white: self.white & !flips,
            },
            Side::White => Board {
                black: self.black & !flips,
                white: self.white | gained,
            },
        }
    }

    // ========== Counting ==========

    /// Returns `(black_count, white_count)`.
    #[inline]
    pub fn piece_counts(&self) -> (u8, u8) {
        (self.black.count_ones() as u8, self.white.count_ones() as u8)
    }

    /// Number of pieces owned by one side.
    #[inline]
    pub fn count(&self, side: Side) -> u8 {
        self.mask(side).count_ones() as u8
    }

    /// Number of empty squares.
    #[inline]
    pub fn empty_count(&self) -> u8 {
        NUM_SQUARES - self.occupied().count_ones() as u8
    }

    /// Board as 8 rows of cells, row 0 first.
    pub fn rows(&self) -> [[Cell; 8]; 8] {
        let mut rows = [[Cell::Empty; 8]; 8];
        for pos in Pos::all() {
            rows[pos.row() as usize][pos.col() as usize] = self.cell(pos);
        }
        rows
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders the board as 8 lines of `.`, `B` and `W`, the format
/// accepted by [`Board::from_rows`].
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let line: String = row
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => '.',
                    Cell::Black => 'B',
                    Cell::White => 'W',
                })
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
