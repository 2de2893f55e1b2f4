//! WebSocket API Layer
//!
//! Upgrades `GET /ws` and hands each socket to the core session loop.

pub mod server;
pub mod transport;

pub use server::{WsServer, WsServerConfig, WsServerHandle};
