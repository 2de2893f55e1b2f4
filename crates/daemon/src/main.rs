//! Courier - Main Entry Point
//! WebSocket room hub + JSON-RPC admin + in-process task queue

mod config;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Settings;
use courier_api_rpc::RpcServer;
use courier_api_ws::WsServer;
use courier_core::application::{Dispatcher, Hub, InMemoryQueue, MailJob};
use courier_infra_memory::{InMemoryChatService, LogMailer, TokenTable};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging() -> Result<()> {
    let log_format = std::env::var("COURIER_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("courier=info"))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    init_logging()?;
    info!("Courier v{} starting...", VERSION);

    // 2. Load configuration
    let settings = Settings::from_env()?;

    // 3. Setup dependencies (DI wiring)
    let tokens = TokenTable::parse(&settings.dev_tokens).context("Invalid COURIER_DEV_TOKENS")?;
    if tokens.is_empty() {
        warn!("No dev tokens configured; every token-checked request will be rejected");
    }
    let hub = Arc::new(Hub::new());
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&hub),
        Arc::new(tokens),
        Arc::new(InMemoryChatService::new()),
    ));

    // 4. Task queue with built-in jobs
    let queue = Arc::new(InMemoryQueue::new(settings.queue.clone()));
    queue.register_job(Arc::new(MailJob::new(Arc::new(LogMailer::new()))));
    queue.start().context("Queue start failed")?;

    // 5. Start JSON-RPC admin server
    let (rpc_addr, rpc_handle) = RpcServer::new(settings.rpc.clone(), Arc::clone(&queue), Arc::clone(&hub))
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 6. Start WebSocket server
    let ws_handle = WsServer::new(settings.ws.clone(), dispatcher)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("WebSocket server start failed: {}", e))?;

    info!(ws = %ws_handle.local_addr(), rpc = %rpc_addr, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown: stop intake first, then drain workers
    if let Err(e) = ws_handle.stop(settings.shutdown_grace).await {
        error!(error = %e, "WebSocket server stop failed");
    }
    if rpc_handle.stop().is_ok() {
        rpc_handle.stopped().await;
    }
    if let Err(e) = queue.stop(settings.shutdown_grace).await {
        error!(error = %e, "Queue stop failed");
    }

    info!("Shutdown complete.");
    Ok(())
}
