//! Fan-out of relay events to connected WebSocket clients.

use std::collections::HashMap;
use std::sync::Arc;

use murmur_core::{ConnectionId, ServerEvent};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::connection::ClientConnection;

/// Every live connection, joined or not, indexed by connection ID.
pub struct ConnectionHub {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

fn encode(event: &ServerEvent) -> Option<Arc<String>> {
    match event.to_json() {
        Ok(json) => Some(Arc::new(json)),
        Err(e) => {
            warn!(event = event.name(), error = %e, "failed to serialize event");
            None
        }
    }
}

impl ConnectionHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id.clone(), connection);
    }

    /// Remove a connection by ID.
    pub async fn remove(&self, connection_id: &ConnectionId) {
        let mut conns = self.connections.write().await;
        let _ = conns.remove(connection_id);
    }

    /// Send an event to one connection.
    ///
    /// Returns `false` when the connection is gone or its queue is full;
    /// the event is dropped in both cases.
    pub async fn send_to(&self, connection_id: &ConnectionId, event: &ServerEvent) -> bool {
        let Some(frame) = encode(event) else {
            return false;
        };
        let conns = self.connections.read().await;
        Self::deliver(&conns, connection_id, frame, event)
    }

    /// Send the same serialized event to several connections.
    ///
    /// The event is encoded once, so every recipient receives a byte-identical
    /// frame. Returns how many queues accepted it.
    pub async fn send_to_each(&self, connection_ids: &[&ConnectionId], event: &ServerEvent) -> usize {
        let Some(frame) = encode(event) else {
            return 0;
        };
        let conns = self.connections.read().await;
        connection_ids
            .iter()
            .filter(|id| Self::deliver(&conns, id, frame.clone(), event))
            .count()
    }

    fn deliver(
        conns: &HashMap<ConnectionId, Arc<ClientConnection>>,
        connection_id: &ConnectionId,
        frame: Arc<String>,
        event: &ServerEvent,
    ) -> bool {
        match conns.get(connection_id) {
            Some(conn) => {
                let sent = conn.send(frame);
                if !sent {
                    warn!(conn_id = %connection_id, event = event.name(), "outbound queue full or closed, dropping event");
                }
                sent
            }
            None => {
                debug!(conn_id = %connection_id, event = event.name(), "connection gone, dropping event");
                false
            }
        }
    }

    /// Broadcast an event to all connections.
    pub async fn broadcast_all(&self, event: &ServerEvent) {
        let Some(frame) = encode(event) else {
            return;
        };
        let conns = self.connections.read().await;
        debug!(event = event.name(), recipients = conns.len(), "broadcast event to all");
        for conn in conns.values() {
            if !conn.send(frame.clone()) {
                warn!(conn_id = %conn.id, event = event.name(), "failed to send event to client");
            }
        }
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether `connection_id` is live.
    pub async fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(connection_id)
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_connection(id: &str) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        (Arc::new(ClientConnection::new(ConnectionId::from(id), tx)), rx)
    }

    fn joined(name: &str) -> ServerEvent {
        ServerEvent::Joined { username: name.into() }
    }

    #[tokio::test]
    async fn add_and_remove() {
        let hub = ConnectionHub::new();
        let (c1, _rx) = make_connection("c1");
        hub.add(c1).await;
        assert_eq!(hub.connection_count().await, 1);
        assert!(hub.contains(&ConnectionId::from("c1")).await);
        hub.remove(&ConnectionId::from("c1")).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn remove_nonexistent_connection() {
        let hub = ConnectionHub::new();
        hub.remove(&ConnectionId::from("no_such")).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn send_to_targets_one_connection() {
        let hub = ConnectionHub::new();
        let (c1, mut rx1) = make_connection("c1");
        let (c2, mut rx2) = make_connection("c2");
        hub.add(c1).await;
        hub.add(c2).await;

        assert!(hub.send_to(&ConnectionId::from("c1"), &joined("alice")).await);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_missing_connection_is_silent_noop() {
        let hub = ConnectionHub::new();
        assert!(!hub.send_to(&ConnectionId::from("gone"), &joined("alice")).await);
    }

    #[tokio::test]
    async fn send_to_each_uses_identical_frames() {
        let hub = ConnectionHub::new();
        let (c1, mut rx1) = make_connection("c1");
        let (c2, mut rx2) = make_connection("c2");
        hub.add(c1).await;
        hub.add(c2).await;

        let a = ConnectionId::from("c1");
        let b = ConnectionId::from("c2");
        let gone = ConnectionId::from("c3");
        let delivered = hub.send_to_each(&[&a, &b, &gone], &joined("x")).await;
        assert_eq!(delivered, 2);
        let f1 = rx1.try_recv().unwrap();
        let f2 = rx2.try_recv().unwrap();
        assert!(Arc::ptr_eq(&f1, &f2));
    }

    #[tokio::test]
    async fn broadcast_reaches_everyone() {
        let hub = ConnectionHub::new();
        let (c1, mut rx1) = make_connection("c1");
        let (c2, mut rx2) = make_connection("c2");
        hub.add(c1).await;
        hub.add(c2).await;

        hub.broadcast_all(&ServerEvent::UsersUpdate(vec![])).await;
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn broadcast_to_empty_hub() {
        let hub = ConnectionHub::default();
        hub.broadcast_all(&ServerEvent::UsersUpdate(vec![])).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn add_overwrites_same_id() {
        let hub = ConnectionHub::new();
        let (first, mut rx_first) = make_connection("same");
        let (second, mut rx_second) = make_connection("same");
        hub.add(first).await;
        hub.add(second).await;
        assert_eq!(hub.connection_count().await, 1);
        assert!(hub.send_to(&ConnectionId::from("same"), &joined("a")).await);
        assert!(rx_first.try_recv().is_err());
        assert!(rx_second.try_recv().is_ok());
    }
}
