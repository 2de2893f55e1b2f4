//! JSON-RPC Server
//!
//! Admin endpoint over HTTP on localhost.

use crate::handler::RpcHandler;
use crate::rate_limiter::RateLimiter;
use crate::types::PublishRequest;
use courier_core::application::{Hub, InMemoryQueue};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9527;
const DEFAULT_RATE_LIMIT_BURST: u32 = 200;
const DEFAULT_RATE_LIMIT_RATE: u32 = 100;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 picks a free port (tests)
    pub port: u16,
    pub rate_limit_burst: u32,
    pub rate_limit_rate: u32,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
            rate_limit_rate: DEFAULT_RATE_LIMIT_RATE,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, queue: Arc<InMemoryQueue>, hub: Arc<Hub>) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_burst, config.rate_limit_rate);
        Self {
            config,
            handler: Arc::new(RpcHandler::new(queue, hub, rate_limiter)),
        }
    }

    /// Start the JSON-RPC server, returning the bound address and its handle
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read local address: {}", e))?;

        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_async_method("queue.publish.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: PublishRequest = params.parse()?;
                    handler.publish(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.stats.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.queue_stats().await }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("hub.stats.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.hub_stats().await }
            })
            .map_err(|e| e.to_string())?;

        info!(addr = %local_addr, "JSON-RPC server started");

        let handle = server.start(module);
        Ok((local_addr, handle))
    }
}
