//! JSON wire format shared with the browser client.
//!
//! Every frame is `{"type": ..., "payload": ...}`:
//!
//! ```text
//! server -> client   ASSIGNED {color}
//!                    UPDATE   {board, currentPlayer, winner, gameOver,
//!                              blackCount, whiteCount, validMoves,
//!                              lastMove, flipped, passed}
//!                    ERROR    {message}
//! client -> server   MOVE     {row, col}
//!                    RESTART
//! ```
//!
//! Coordinates travel as `[row, col]` pairs.

use serde::{Deserialize, Serialize};

use reversi_core::{GameState, Pos, Side, Winner};

use crate::error::ProtocolError;

// =============================================================================
// Outbound
// =============================================================================

/// Server → Client messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    Assigned { color: Side },
    Update(UpdatePayload),
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> ServerMessage {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

/// Full game snapshot broadcast after every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    /// 8 rows of 8 squares; `null` for empty.
    pub board: Vec<Vec<Option<Side>>>,
    pub current_player: Side,
    pub winner: Option<Winner>,
    pub game_over: bool,
    pub black_count: u8,
    pub white_count: u8,
    /// Legal moves for `current_player`.
    pub valid_moves: Vec<[u8; 2]>,
    pub last_move: Option<[u8; 2]>,
    pub flipped: Vec<[u8; 2]>,
    pub passed: bool,
}

impl UpdatePayload {
    pub fn from_state(state: &GameState) -> UpdatePayload {
        let board = state
            .board
            .rows()
            .iter()
            .map(|row| row.iter().map(|cell| cell.side()).collect())
            .collect();

        UpdatePayload {
            board,
            current_player: state.side_to_move,
            winner: state.winner,
            game_over: state.game_over,
            black_count: state.black_count,
            white_count: state.white_count,
            valid_moves: state.legal_moves().into_iter().map(coords).collect(),
            last_move: state.last_move.map(coords),
            flipped: state.flipped.iter().copied().map(coords).collect(),
            passed: state.passed,
        }
    }
}

fn coords(pos: Pos) -> [u8; 2] {
    [pos.row(), pos.col()]
}

/// Serialize an outbound message to a text frame.
pub fn encode(message: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

// =============================================================================
// Inbound
// =============================================================================

/// Client → Server messages, after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    Move { pos: Pos },
    Restart,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Deserialize)]
struct MoveRequest {
    row: i64,
    col: i64,
}

/// Parse and validate one inbound binary frame holding UTF-8 JSON.
pub fn parse_client_bytes(bytes: &[u8]) -> Result<ClientMessage, ProtocolError> {
    parse_client_message(std::str::from_utf8(bytes)?)
}

/// Parse and validate one inbound text frame.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text)?;

    match envelope.kind.as_str() {
        "MOVE" => {
            let req: MoveRequest = serde_json::from_value(envelope.payload)?;
            let pos = Pos::new(req.row, req.col).ok_or(ProtocolError::OutOfRange {
                row: req.row,
                col: req.col,
            })?;
            Ok(ClientMessage::Move { pos })
        }
        // Any payload is ignored.
        "RESTART" => Ok(ClientMessage::Restart),
        other => Err(ProtocolError::UnknownType(other.to_string())),
    }
}
