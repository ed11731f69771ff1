//! Authoritative two-player Reversi server.
//!
//! [`session::Session`] owns the game and the two participant slots;
//! [`transport`] exposes it over an axum WebSocket with JSON frames
//! described in [`protocol`].

pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod transport;

pub use config::ServerConfig;
pub use error::{ConfigError, ProtocolError, RegistryError, ServerError};
pub use registry::{ConnId, ConnectionRegistry};
pub use session::{Delivery, Recipient, Session};
