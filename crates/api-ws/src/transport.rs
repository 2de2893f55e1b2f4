//! axum WebSocket halves as core transport ports

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use courier_core::domain::OutboundFrame;
use courier_core::port::{FrameSink, FrameSource, TransportError};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Split an upgraded socket into (source, sink).
///
/// The source ends the stream once `shutdown` fires, so the session tears
/// down normally when the server stops.
pub fn split(socket: WebSocket, shutdown: CancellationToken) -> (AxumSource, AxumSink) {
    let (sink, stream) = socket.split();
    (
        AxumSource {
            stream,
            shutdown,
        },
        AxumSink { sink },
    )
}

pub struct AxumSource {
    stream: SplitStream<WebSocket>,
    shutdown: CancellationToken,
}

#[async_trait]
impl FrameSource for AxumSource {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let next = tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                message = self.stream.next() => message,
            };

            match next? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => debug!("Skipping non UTF-8 binary frame"),
                },
                Ok(Message::Close(_)) => return None,
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => trace!("Control frame"),
                Err(e) => return Some(Err(TransportError::Io(e.to_string()))),
            }
        }
    }
}

pub struct AxumSink {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl FrameSink for AxumSink {
    async fn send(&mut self, frame: &OutboundFrame) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(frame.as_str().into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = SinkExt::close(&mut self.sink).await {
            debug!(error = %e, "WebSocket close failed");
        }
    }
}
