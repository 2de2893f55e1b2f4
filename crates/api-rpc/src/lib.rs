//! JSON-RPC Admin API
//!
//! JSON-RPC 2.0 server exposing queue publishing and runtime statistics.

pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig};
