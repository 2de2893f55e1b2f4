// Real-time delivery: connections, room hub and envelope routing

pub mod constants;
mod connection;
mod dispatch;
mod hub;
mod session;

pub use connection::{Connection, ConnectionHandle, ConnectionStatus, DeliveryError};
pub use dispatch::Dispatcher;
pub use hub::{BroadcastReport, Hub};
pub use session::run_connection;
