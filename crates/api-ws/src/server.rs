//! WebSocket Server
//!
//! `GET /ws` upgrades to a real-time connection, `GET /healthz` reports hub
//! occupancy.

use crate::transport;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use courier_core::application::{run_connection, Dispatcher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const DEFAULT_WS_HOST: &str = "127.0.0.1";
const DEFAULT_WS_PORT: u16 = 8080;

/// WebSocket Server Configuration
#[derive(Debug, Clone)]
pub struct WsServerConfig {
    pub host: String,
    /// 0 picks a free port (tests)
    pub port: u16,
}

impl Default for WsServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_WS_HOST.to_string(),
            port: DEFAULT_WS_PORT,
        }
    }
}

#[derive(Clone)]
struct WsState {
    dispatcher: Arc<Dispatcher>,
    sessions: CancellationToken,
}

/// Build the axum router
fn build_router(state: WsState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(health_handler))
        .with_state(state)
}

pub struct WsServer {
    config: WsServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl WsServer {
    pub fn new(config: WsServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// Bind and serve in a background task
    pub async fn start(self) -> Result<WsServerHandle, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| format!("Failed to read local address: {}", e))?;

        let sessions = CancellationToken::new();
        let router = build_router(WsState {
            dispatcher: self.dispatcher,
            sessions: sessions.clone(),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                error!(error = %e, "WebSocket server failed");
            }
        });

        info!(addr = %local_addr, "WebSocket server started");

        Ok(WsServerHandle {
            local_addr,
            shutdown: shutdown_tx,
            sessions,
            task,
        })
    }
}

/// Running server. Dropping the handle also stops the listener.
pub struct WsServerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    sessions: CancellationToken,
    task: JoinHandle<()>,
}

impl WsServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, end live sessions, wait up to `grace` for the listener
    pub async fn stop(self, grace: Duration) -> Result<(), String> {
        let _ = self.shutdown.send(());
        self.sessions.cancel();

        let mut task = self.task;
        let result = tokio::time::timeout(grace, &mut task).await;
        match result {
            Ok(Ok(())) => {
                info!("WebSocket server stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(format!("WebSocket server task failed: {}", e)),
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "WebSocket server did not stop in time");
                task.abort();
                Err("Timed out stopping WebSocket server".to_string())
            }
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let (source, sink) = transport::split(socket, state.sessions.child_token());
    run_connection(state.dispatcher, source, sink).await;
}

async fn health_handler(State(state): State<WsState>) -> impl IntoResponse {
    let stats = state.dispatcher.hub().stats();
    Json(serde_json::json!({
        "status": "ok",
        "rooms": stats.rooms,
        "memberships": stats.memberships,
    }))
}
