// Courier Core - Domain Logic, Ports & Concurrency Services
// NO infrastructure dependencies: adapters implement the traits in `port`

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, QueueError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
