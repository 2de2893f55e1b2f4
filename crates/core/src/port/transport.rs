// Real-time Transport Port
// The session loop speaks to these halves; the axum adapter and the in-memory
// test transport both implement them

use crate::domain::OutboundFrame;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection closed")]
    Closed,

    #[error("Transport error: {0}")]
    Io(String),
}

/// Inbound half: yields one text frame at a time
#[async_trait]
pub trait FrameSource: Send {
    /// Next text frame; `None` once the peer ended the stream.
    ///
    /// Must be cancel safe: the session selects on it.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
}

/// Outbound half, owned by the connection's writer task
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: &OutboundFrame) -> Result<(), TransportError>;

    /// Best-effort close after the send channel is drained
    async fn close(&mut self);
}

// ============================================================================
// In-memory transport for tests
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Create a connected (source, sink, peer) triple.
    ///
    /// The peer plays the remote client: what it sends shows up in the source,
    /// what the server writes to the sink shows up in the peer.
    pub fn memory_transport() -> (MemorySource, MemorySink, MemoryPeer) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let broken = Arc::new(AtomicBool::new(false));

        (
            MemorySource { inbound: in_rx },
            MemorySink {
                outbound: out_tx,
                closed: Arc::clone(&closed),
                broken: Arc::clone(&broken),
            },
            MemoryPeer {
                inbound: Some(in_tx),
                outbound: out_rx,
                closed,
                broken,
            },
        )
    }

    pub struct MemorySource {
        inbound: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    }

    #[async_trait]
    impl FrameSource for MemorySource {
        async fn recv(&mut self) -> Option<Result<String, TransportError>> {
            self.inbound.recv().await
        }
    }

    pub struct MemorySink {
        outbound: mpsc::UnboundedSender<String>,
        closed: Arc<AtomicBool>,
        broken: Arc<AtomicBool>,
    }

    #[async_trait]
    impl FrameSink for MemorySink {
        async fn send(&mut self, frame: &OutboundFrame) -> Result<(), TransportError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(TransportError::Io("broken pipe".to_string()));
            }
            self.outbound
                .send(frame.as_str().to_string())
                .map_err(|_| TransportError::Closed)
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Remote end of an in-memory transport
    pub struct MemoryPeer {
        inbound: Option<mpsc::UnboundedSender<Result<String, TransportError>>>,
        outbound: mpsc::UnboundedReceiver<String>,
        closed: Arc<AtomicBool>,
        broken: Arc<AtomicBool>,
    }

    impl MemoryPeer {
        pub fn send_text(&self, text: impl Into<String>) {
            if let Some(tx) = &self.inbound {
                let _ = tx.send(Ok(text.into()));
            }
        }

        pub fn send_json(&self, value: serde_json::Value) {
            self.send_text(value.to_string());
        }

        /// Inject a transport-level read error
        pub fn fail(&self, reason: &str) {
            if let Some(tx) = &self.inbound {
                let _ = tx.send(Err(TransportError::Io(reason.to_string())));
            }
        }

        /// Make every further server write fail
        pub fn break_writes(&self) {
            self.broken.store(true, Ordering::SeqCst);
        }

        /// End the inbound stream (peer hung up)
        pub fn disconnect(&mut self) {
            self.inbound.take();
        }

        /// Next frame written by the server, parsed as JSON
        pub async fn recv_json(&mut self, timeout: Duration) -> Option<serde_json::Value> {
            let text = tokio::time::timeout(timeout, self.outbound.recv())
                .await
                .ok()??;
            serde_json::from_str(&text).ok()
        }

        /// True if nothing arrives within `window`
        pub async fn expect_silence(&mut self, window: Duration) -> bool {
            !matches!(
                tokio::time::timeout(window, self.outbound.recv()).await,
                Ok(Some(_))
            )
        }

        /// Whether the server closed its sink
        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }
}
