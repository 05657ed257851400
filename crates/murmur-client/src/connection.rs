//! WebSocket link to a murmur relay.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use murmur_core::{ClientEvent, ServerEvent};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

use crate::errors::ConnectError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An open relay connection.
#[derive(Debug)]
pub struct RelayConnection {
    socket: Socket,
}

impl RelayConnection {
    /// Connect to `url` (e.g. `ws://127.0.0.1:3000/ws`).
    pub async fn connect(url: &str) -> Result<Self, ConnectError> {
        let (socket, _response) = connect_async(url).await?;
        info!(url, "connected to relay");
        Ok(Self { socket })
    }

    /// Split into independently owned send and receive halves.
    pub fn split(self) -> (RelaySender, RelayReceiver) {
        let (sink, stream) = self.socket.split();
        (RelaySender { sink }, RelayReceiver { stream })
    }
}

/// Sending half of a relay connection.
pub struct RelaySender {
    sink: SplitSink<Socket, Message>,
}

impl RelaySender {
    /// Send one event.
    pub async fn send(&mut self, event: &ClientEvent) -> Result<(), ConnectError> {
        let json = serde_json::to_string(event)?;
        self.sink.send(Message::text(json)).await?;
        Ok(())
    }

    /// Close the connection.
    pub async fn close(&mut self) -> Result<(), ConnectError> {
        self.sink.close().await?;
        Ok(())
    }
}

/// Receiving half of a relay connection.
pub struct RelayReceiver {
    stream: SplitStream<Socket>,
}

impl RelayReceiver {
    /// Wait for the next relay event.
    ///
    /// Control frames are skipped. Returns `None` once the relay closes the
    /// connection.
    pub async fn next_event(&mut self) -> Option<Result<ServerEvent, ConnectError>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(e.into())),
            };
            let text = match msg {
                Message::Text(text) => text,
                Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => text.into(),
                    Err(_) => continue,
                },
                Message::Close(frame) => {
                    debug!(?frame, "relay closed the connection");
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };
            return Some(serde_json::from_str(text.as_str()).map_err(ConnectError::from));
        }
    }
}
