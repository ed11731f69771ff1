//! Turn state machine: alternation, forced passes and game end.

use serde::{Deserialize, Serialize};

use crate::{Board, Pos, Side};

/// Final result of a finished game.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Black,
    White,
    Draw,
}

impl Winner {
    /// Winner by strict majority of pieces, Draw on equal counts.
    pub fn from_counts(black: u8, white: u8) -> Winner {
        match black.cmp(&white) {
            std::cmp::Ordering::Greater => Winner::Black,
            std::cmp::Ordering::Less => Winner::White,
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }
}

/// Reason a move request was rejected. The state it was checked against is
/// left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("game is over")]
    GameOver,

    #[error("not your turn")]
    NotYourTurn { expected: Side, got: Side },

    #[error("invalid move")]
    Illegal { row: u8, col: u8 },
}

/// A complete snapshot of one game.
///
/// Never mutated after construction; [`GameState::play`] returns a new value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    /// Meaningless for further play once `game_over` is set.
    pub side_to_move: Side,
    pub winner: Option<Winner>,
    pub game_over: bool,
    pub black_count: u8,
    pub white_count: u8,
    /// Square played to reach this state; None for a fresh game.
    pub last_move: Option<Pos>,
    /// Squares flipped by `last_move`, row-major.
    pub flipped: Vec<Pos>,
    /// True when the opponent had no reply and the mover goes again.
    pub passed: bool,
}

impl GameState {
    /// Fresh game: standard opening, Black to move.
    pub fn new() -> GameState {
        let board = Board::new();
        let (black_count, white_count) = board.piece_counts();
        GameState {
            board,
            side_to_move: Side::Black,
            winner: None,
            game_over: false,
            black_count,
            white_count,
            last_move: None,
            flipped: Vec::new(),
            passed: false,
        }
    }

    /// Build a state from an arbitrary position with `preferred` to move.
    ///
    /// The turn is normalized with the same rules as a move: if `preferred`
    /// cannot move the opponent gets the turn, and if neither side can move
    /// the game is over.
    pub fn from_board(board: Board, preferred: Side) -> GameState {
        Self::settle(board, preferred, None, Vec::new())
    }

    /// Legal moves for the side to move; empty once the game is over.
    pub fn legal_moves(&self) -> Vec<Pos> {
        if self.game_over {
            Vec::new()
        } else {
            self.board.legal_moves(self.side_to_move)
        }
    }

    /// Validate and apply a move by `side` at `pos`.
    ///
    /// Checks run in order: game over, turn, legality. On success the
    /// returned state is derived from `self` alone.
    pub fn play(&self, side: Side, pos: Pos) -> Result<GameState, MoveError> {
        if self.game_over {
            return Err(MoveError::GameOver);
        }
        if side != self.side_to_move {
            return Err(MoveError::NotYourTurn {
                expected: self.side_to_move,
                got: side,
            });
        }

        let flips = self.board.flips(pos, side);
        if flips == 0 {
            return Err(MoveError::Illegal {
                row: pos.row(),
                col: pos.col(),
            });
        }

        let board = self.board.apply_move(pos, side);
        let flipped = Pos::from_mask(flips).collect();
        Ok(Self::settle(board, side.opponent(), Some(pos), flipped))
    }

    /// Decide who moves next on `board`, preferring `next`.
    fn settle(board: Board, next: Side, last_move: Option<Pos>, flipped: Vec<Pos>) -> GameState {
        let (black_count, white_count) = board.piece_counts();
        let next_can_move = board.has_legal_move(next);
        let other_can_move = board.has_legal_move(next.opponent());

        let (side_to_move, winner, game_over, passed) = if !next_can_move && !other_can_move {
            (next, Some(Winner::from_counts(black_count, white_count)), true, false)
        } else if next_can_move {
            (next, None, false, false)
        } else {
            // Forced pass.
            (next.opponent(), None, false, last_move.is_some())
        };

        GameState {
            board,
            side_to_move,
            winner,
            game_over,
            black_count,
            white_count,
            last_move,
            flipped,
            passed,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: u8, col: u8) -> Pos {
        Pos::from_row_col(row, col)
    }

    #[test]
    fn test_new_game() {
        let state = GameState::new();
        assert_eq!(state.side_to_move, Side::Black);
        assert_eq!(state.winner, None);
        assert!(!state.game_over);
        assert_eq!((state.black_count, state.white_count), (2, 2));
        assert_eq!(state.legal_moves().len(), 4);
        assert_eq!(state.last_move, None);
        assert!(!state.passed);
    }

    #[test]
    fn test_opening_move_alternates_turn() {
        let state = GameState::new();
        let next = state.play(Side::Black, pos(2, 3)).unwrap();

        assert_eq!(next.side_to_move, Side::White);
        assert_eq!((next.black_count, next.white_count), (4, 1));
        assert_eq!(next.last_move, Some(pos(2, 3)));
        assert_eq!(next.flipped, vec![pos(3, 3)]);
        assert!(!next.passed);
        assert!(!next.game_over);

        // The prior snapshot is untouched.
        assert_eq!(state, GameState::new());
    }

    #[test]
    fn test_wrong_side_rejected() {
        let state = GameState::new();
        let err = state.play(Side::White, pos(2, 4)).unwrap_err();
        assert_eq!(
            err,
            MoveError::NotYourTurn {
                expected: Side::Black,
                got: Side::White
            }
        );
        assert_eq!(err.to_string(), "not your turn");
    }

    #[test]
    fn test_illegal_square_rejected() {
        let state = GameState::new();
        assert_eq!(
            state.play(Side::Black, pos(0, 0)),
            Err(MoveError::Illegal { row: 0, col: 0 })
        );
        assert_eq!(
            state.play(Side::Black, pos(3, 3)),
            Err(MoveError::Illegal { row: 3, col: 3 })
        );
    }

    #[test]
    fn test_forced_pass_keeps_mover() {
        // Black plays (0,2) flipping (0,1). White's only piece left is
        // (7,1), which has no reply; Black can still play (7,2).
        let board = Board::from_rows(&[
            "BW......",
            "........",
            "........",
            "........",
            "........",
            "........",
            "........",
            "BW......",
        ])
        .unwrap();
        let state = GameState::from_board(board, Side::Black);
        assert_eq!(state.side_to_move, Side::Black);

        let next = state.play(Side::Black, pos(0, 2)).unwrap();
        assert!(next.board.legal_moves(Side::White).is_empty());
        assert_eq!(next.board.legal_moves(Side::Black), vec![pos(7, 2)]);
        assert_eq!(next.side_to_move, Side::Black);
        assert!(next.passed);
        assert!(!next.game_over);

        let last = next.play(Side::Black, pos(7, 2)).unwrap();
        assert!(last.game_over);
        assert_eq!(last.winner, Some(Winner::Black));
    }

    #[test]
    fn test_game_over_majority_winner() {
        // Black fills the last square, wiping out White.
        let board = Board::from_rows(&[
            "BBBBBBBB",
            "BBBBBBBB",
            "BBBBBBBB",
            "BBBBBBBB",
            "BBBBBBBB",
            "BBBBBBBB",
            "BBBBBBBB",
            "BBBBBBW.",
        ])
        .unwrap();
        let state = GameState::from_board(board, Side::Black);
        let end = state.play(Side::Black, pos(7, 7)).unwrap();

        assert!(end.game_over);
        assert_eq!(end.winner, Some(Winner::Black));
        assert_eq!((end.black_count, end.white_count), (64, 0));
        assert!(end.legal_moves().is_empty());
        assert_eq!(end.play(Side::Black, pos(0, 0)), Err(MoveError::GameOver));
        assert_eq!(end.play(Side::White, pos(0, 0)), Err(MoveError::GameOver));
    }

    #[test]
    fn test_game_over_draw() {
        // Black takes the last square and flips (3,6), leaving 32/32.
        let board = Board::from_rows(&[
            "BBBBBBBB",
            "BBBBBBBB",
            "BBBBBBBB",
            "BBBBBBW.",
            "WWWWWWWW",
            "WWWWWWWW",
            "WWWWWWWW",
            "WWWWWWWW",
        ])
        .unwrap();
        let state = GameState::from_board(board, Side::Black);
        let end = state.play(Side::Black, pos(3, 7)).unwrap();

        assert_eq!(end.flipped, vec![pos(3, 6)]);
        assert!(end.game_over);
        assert_eq!((end.black_count, end.white_count), (32, 32));
        assert_eq!(end.winner, Some(Winner::Draw));
    }

    #[test]
    fn test_winner_from_counts() {
        assert_eq!(Winner::from_counts(33, 31), Winner::Black);
        assert_eq!(Winner::from_counts(10, 54), Winner::White);
        assert_eq!(Winner::from_counts(32, 32), Winner::Draw);
    }

    #[test]
    fn test_from_board_hands_turn_to_side_with_moves() {
        let board = Board::from_rows(&[
            "BW......",
            "........",
            "........",
            "........",
            "........",
            "........",
            "........",
            "........",
        ])
        .unwrap();
        // White has no move; Black has (0,2).
        let state = GameState::from_board(board, Side::White);
        assert_eq!(state.side_to_move, Side::Black);
        assert!(!state.passed);
    }

    #[test]
    fn test_from_board_without_moves_is_over() {
        let state = GameState::from_board(Board::empty(), Side::Black);
        assert!(state.game_over);
        assert_eq!(state.winner, Some(Winner::Draw));
    }

    #[test]
    fn test_move_error_messages() {
        assert_eq!(MoveError::GameOver.to_string(), "game is over");
        assert_eq!(MoveError::Illegal { row: 1, col: 2 }.to_string(), "invalid move");
    }
}
