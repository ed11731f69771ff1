//! axum transport: WebSocket endpoint plus a couple of read-only routes.
//!
//! Each socket gets an unbounded outbox drained by its own writer task.
//! All session events go through one `Mutex<Room>`; the lock is taken only
//! in synchronous code and never held across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::protocol::{self, ServerMessage, UpdatePayload};
use crate::registry::ConnId;
use crate::session::{Delivery, Recipient, Session};

// =============================================================================
// Room
// =============================================================================

/// A session plus the outboxes of its registered connections.
#[derive(Default)]
pub struct Room {
    session: Session,
    outboxes: HashMap<ConnId, mpsc::UnboundedSender<ServerMessage>>,
}

impl Room {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Seat a connection and sync it.
    ///
    /// When the room is full nothing is kept and the error is the refusal
    /// frame the socket must receive before it is closed.
    pub fn join(
        &mut self,
        conn: ConnId,
        outbox: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<(), ServerMessage> {
        match self.session.connect(conn) {
            Ok(deliveries) => {
                self.outboxes.insert(conn, outbox);
                self.dispatch(deliveries);
                Ok(())
            }
            Err(err) => {
                warn!(%conn, error = %err, "refusing connection");
                Err(ServerMessage::error(err.to_string()))
            }
        }
    }

    pub fn leave(&mut self, conn: ConnId) {
        self.outboxes.remove(&conn);
        self.session.disconnect(conn);
    }

    pub fn handle_text(&mut self, conn: ConnId, text: &str) {
        let deliveries = self.session.handle_text(conn, text);
        self.dispatch(deliveries);
    }

    pub fn handle_binary(&mut self, conn: ConnId, bytes: &[u8]) {
        let deliveries = self.session.handle_binary(conn, bytes);
        self.dispatch(deliveries);
    }

    fn dispatch(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            match delivery.to {
                Recipient::One(conn) => self.send(conn, delivery.message),
                Recipient::All => {
                    for conn in self.session.registry().connections() {
                        self.send(conn, delivery.message.clone());
                    }
                }
            }
        }
    }

    fn send(&self, conn: ConnId, message: ServerMessage) {
        // A closed outbox means the writer is gone; leave() cleans up.
        if let Some(outbox) = self.outboxes.get(&conn) {
            if outbox.send(message).is_err() {
                debug!(%conn, "outbox closed, dropping message");
            }
        }
    }
}

// =============================================================================
// Shared state
// =============================================================================

pub struct AppStateInner {
    room: Mutex<Room>,
    next_conn: AtomicU64,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn shared() -> AppState {
        Arc::new(AppStateInner {
            room: Mutex::new(Room::new()),
            next_conn: AtomicU64::new(1),
        })
    }

    /// Lock the room. A panic while holding the lock cannot leave the
    /// session half-updated, so a poisoned lock is recovered.
    pub fn room(&self) -> MutexGuard<'_, Room> {
        self.room.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_conn_id(&self) -> ConnId {
        ConnId(self.next_conn.fetch_add(1, Ordering::Relaxed))
    }
}

// =============================================================================
// Routes
// =============================================================================

#[derive(Serialize)]
struct HealthModel {
    status: String,
}

async fn health() -> Json<HealthModel> {
    Json(HealthModel {
        status: "ok".to_string(),
    })
}

async fn get_game(State(state): State<AppState>) -> Json<UpdatePayload> {
    let room = state.room();
    Json(UpdatePayload::from_state(room.session().state()))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn = state.next_conn_id();
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel::<ServerMessage>();

    let joined = state.room().join(conn, outbox);
    if let Err(refusal) = joined {
        if let Ok(text) = protocol::encode(&refusal) {
            let _ = sender.send(Message::Text(text.into())).await;
        }
        let _ = sender.close().await;
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            let text = match protocol::encode(&message) {
                Ok(text) => text,
                Err(err) => {
                    error!(%conn, error = %err, "failed to encode message");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = receiver.next().await {
            match frame {
                Message::Text(text) => recv_state.room().handle_text(conn, text.as_str()),
                Message::Binary(bytes) => recv_state.room().handle_binary(conn, &bytes),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.room().leave(conn);
}

/// Build the application router.
///
/// The socket is served on `/` as well as `/ws` because the browser client
/// dials the bare host.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/game", get(get_game))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
