//! Network layer: wire protocol and the WebSocket server.

pub mod protocol;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage};
pub use server::{GameServer, ServerConfig, ServerError};
