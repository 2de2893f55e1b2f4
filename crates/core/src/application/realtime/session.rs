// Connection session: one reader loop + one writer task per link

use super::connection::Connection;
use super::constants::{OUTBOUND_BUFFER_CAPACITY, WRITER_DRAIN_TIMEOUT};
use super::dispatch::Dispatcher;
use crate::domain::{ConnectionId, OutboundFrame};
use crate::port::{FrameSink, FrameSource};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Serve one connection until the peer goes away or the transport fails.
///
/// On return the connection has left every room and its writer task has
/// either flushed and exited or been aborted.
pub async fn run_connection<S, K>(dispatcher: Arc<Dispatcher>, mut source: S, sink: K)
where
    S: FrameSource,
    K: FrameSink + 'static,
{
    let (connection, outbound) = Connection::new(OUTBOUND_BUFFER_CAPACITY);
    let connection_id = connection.id();
    info!(connection_id = %connection_id, "Connection opened");

    let mut writer = tokio::spawn(write_loop(connection_id, outbound, sink));
    let mut writer_done = false;

    loop {
        tokio::select! {
            frame = source.recv() => match frame {
                Some(Ok(text)) => dispatcher.dispatch_text(&connection, &text).await,
                Some(Err(e)) => {
                    warn!(connection_id = %connection_id, error = %e, "Read failed, closing connection");
                    break;
                }
                None => {
                    debug!(connection_id = %connection_id, "Peer closed connection");
                    break;
                }
            },
            _ = &mut writer => {
                writer_done = true;
                debug!(connection_id = %connection_id, "Writer exited, closing connection");
                break;
            }
        }
    }

    let rooms = connection.close();
    dispatcher.hub().leave_all(&rooms, connection_id);
    // last sender goes away here, so the writer sees the channel close
    drop(connection);

    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        warn!(connection_id = %connection_id, "Writer did not drain in time, aborting");
        writer.abort();
    }

    info!(connection_id = %connection_id, rooms_left = rooms.len(), "Connection closed");
}

/// Drain the send channel to the transport in FIFO order
async fn write_loop<K: FrameSink>(
    connection_id: ConnectionId,
    mut outbound: mpsc::Receiver<OutboundFrame>,
    mut sink: K,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = sink.send(&frame).await {
            warn!(connection_id = %connection_id, error = %e, "Write failed");
            break;
        }
    }
    sink.close().await;
}
