//! The authoritative game room.
//!
//! A [`Session`] owns the only [`GameState`] and the participant registry.
//! Every inbound event is a `&mut self` call that returns the messages to
//! deliver, so the caller decides how to serialize access and fan out.

use tracing::{debug, info, warn};

use reversi_core::GameState;

use crate::error::{ProtocolError, RegistryError};
use crate::protocol::{self, ClientMessage, ServerMessage, UpdatePayload};
use crate::registry::{ConnId, ConnectionRegistry};

/// Who receives a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    One(ConnId),
    /// Every registered connection.
    All,
}

/// One outbound message addressed to one or all participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: Recipient,
    pub message: ServerMessage,
}

impl Delivery {
    pub fn to(conn: ConnId, message: ServerMessage) -> Delivery {
        Delivery {
            to: Recipient::One(conn),
            message,
        }
    }

    pub fn all(message: ServerMessage) -> Delivery {
        Delivery {
            to: Recipient::All,
            message,
        }
    }
}

/// One game shared by up to two participants.
#[derive(Debug, Default)]
pub struct Session {
    state: GameState,
    registry: ConnectionRegistry,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// The broadcast payload for the current state.
    pub fn update_message(&self) -> ServerMessage {
        ServerMessage::Update(UpdatePayload::from_state(&self.state))
    }

    /// Register a new connection.
    ///
    /// The newcomer learns its side, then everyone gets the current state.
    /// Fails with [`RegistryError::RoomFull`] when both sides are taken; the
    /// caller must refuse and close that connection.
    pub fn connect(&mut self, conn: ConnId) -> Result<Vec<Delivery>, RegistryError> {
        let side = self.registry.register(conn)?;
        info!(%conn, %side, players = self.registry.len(), "participant joined");
        Ok(vec![
            Delivery::to(conn, ServerMessage::Assigned { color: side }),
            Delivery::all(self.update_message()),
        ])
    }

    /// Free the slot held by `conn`. The game keeps running.
    pub fn disconnect(&mut self, conn: ConnId) {
        if let Some(side) = self.registry.release(conn) {
            info!(%conn, %side, players = self.registry.len(), "participant left");
        }
    }

    /// Reset to a fresh opening position.
    pub fn restart(&mut self) {
        self.state = GameState::new();
    }

    /// Decode and handle one inbound text frame.
    pub fn handle_text(&mut self, conn: ConnId, text: &str) -> Vec<Delivery> {
        self.handle_frame(conn, protocol::parse_client_message(text))
    }

    /// Decode and handle one inbound binary frame. The bytes must be UTF-8
    /// JSON, exactly like a text frame.
    pub fn handle_binary(&mut self, conn: ConnId, bytes: &[u8]) -> Vec<Delivery> {
        self.handle_frame(conn, protocol::parse_client_bytes(bytes))
    }

    fn handle_frame(
        &mut self,
        conn: ConnId,
        parsed: Result<ClientMessage, ProtocolError>,
    ) -> Vec<Delivery> {
        if self.registry.side_of(conn).is_none() {
            debug!(%conn, "ignoring frame from unassigned connection");
            return Vec::new();
        }

        match parsed {
            Ok(message) => self.handle(conn, message),
            Err(err) => {
                warn!(%conn, error = %err, "malformed frame");
                vec![Delivery::to(conn, ServerMessage::error(err.to_string()))]
            }
        }
    }

    /// Handle one decoded message. Messages from unassigned connections are
    /// ignored.
    pub fn handle(&mut self, conn: ConnId, message: ClientMessage) -> Vec<Delivery> {
        let Some(side) = self.registry.side_of(conn) else {
            debug!(%conn, ?message, "ignoring message from unassigned connection");
            return Vec::new();
        };

        match message {
            ClientMessage::Move { pos } => match self.state.play(side, pos) {
                Ok(next) => {
                    info!(%conn, %side, %pos, flipped = next.flipped.len(), "move accepted");
                    if next.passed {
                        info!(side = %side.opponent(), "no legal reply, turn passes back");
                    }
                    if let Some(winner) = next.winner {
                        info!(
                            ?winner,
                            black = next.black_count,
                            white = next.white_count,
                            "game over"
                        );
                    }
                    self.state = next;
                    vec![Delivery::all(self.update_message())]
                }
                Err(err) => {
                    debug!(%conn, %side, %pos, error = ?err, "move rejected");
                    vec![Delivery::to(conn, ServerMessage::error(err.to_string()))]
                }
            },
            ClientMessage::Restart => {
                info!(%conn, %side, "game restarted");
                self.restart();
                vec![Delivery::all(self.update_message())]
            }
        }
    }
}
