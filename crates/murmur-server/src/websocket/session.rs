//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use murmur_core::{ConnectionId, ServerEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::handler::handle_frame;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::config::ServerConfig;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::router::MessageRouter;

/// How long the writer gets to flush a close frame after the session ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Run a WebSocket session for a connected client.
///
/// 1. Registers the connection with the hub and sends `connected`
/// 2. Forwards queued outbound frames and sends periodic pings
/// 3. Dispatches inbound text (or UTF-8 binary) frames through the router
/// 4. Drops the client once the heartbeat sees `heartbeat_timeout` of silence
/// 5. On exit removes the connection and its session, which re-broadcasts
///    presence when the client had joined
#[instrument(skip_all, fields(conn_id = %connection_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection_id: ConnectionId,
    router: Arc<MessageRouter>,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(config.outbound_buffer.max(1));
    let connection = Arc::new(ClientConnection::new(connection_id.clone(), send_tx));
    let cancel = shutdown.child_token();

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    router.hub().add(connection.clone()).await;
    let _ = connection.send_event(&ServerEvent::Connected {
        connection_id: connection_id.clone(),
    });

    let writer_cancel = cancel.clone();
    let ping_every = config.heartbeat_interval;
    let mut writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(ping_every);
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                frame = send_rx.recv() => {
                    let Some(text) = frame else { break };
                    if ws_tx.send(Message::Text((*text).clone().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                () = writer_cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        writer_cancel.cancel();
    });

    let heartbeat_conn = connection.clone();
    let heartbeat_cancel = cancel.clone();
    let (interval, timeout) = (config.heartbeat_interval, config.heartbeat_timeout);
    let heartbeat = tokio::spawn(async move {
        if run_heartbeat(heartbeat_conn, interval, timeout, heartbeat_cancel.clone()).await
            == HeartbeatResult::TimedOut
        {
            warn!(?timeout, "client unresponsive, disconnecting");
            heartbeat_cancel.cancel();
        }
    });

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            () = cancel.cancelled() => break,
        };
        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(error = %e, "websocket read failed");
                break;
            }
            None => break,
        };
        connection.mark_alive();

        match msg {
            Message::Text(text) => {
                let _ = handle_frame(text.as_str(), &connection_id, &router).await;
            }
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => {
                    let _ = handle_frame(text, &connection_id, &router).await;
                }
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF-8 binary frame");
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    cancel.cancel();
    router.hub().remove(&connection_id).await;
    let _ = router.handle_disconnect(&connection_id).await;

    let age = connection.age();
    info!(dropped = connection.drop_count(), age = ?age, "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(age.as_secs_f64());

    heartbeat.abort();
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
}
