//! Message router: validates client events against the session registry
//! and fans the results out through the connection hub.
//!
//! Every registry mutation is atomic on its own. Presence broadcasts are
//! additionally serialized through `presence_gate` so that snapshots reach
//! clients in the order they were taken: the last `usersUpdate` any client
//! sees always reflects the latest membership.

use std::sync::Arc;

use metrics::counter;
use murmur_core::validation::validate_body;
use murmur_core::{ConnectionId, PrivateMessage, RelayError, ServerEvent};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::metrics::{
    RELAY_JOIN_REJECTIONS_TOTAL, RELAY_JOINS_TOTAL, RELAY_MESSAGE_ERRORS_TOTAL,
    RELAY_MESSAGES_TOTAL, RELAY_PRESENCE_BROADCASTS_TOTAL, RELAY_TYPING_TOTAL,
};
use crate::registry::{Session, SessionRegistry};
use crate::websocket::hub::ConnectionHub;

/// Routes joins, direct messages, typing notices and disconnects.
pub struct MessageRouter {
    registry: Arc<SessionRegistry>,
    hub: Arc<ConnectionHub>,
    presence_gate: Mutex<()>,
}

impl MessageRouter {
    /// Create a router over a registry and a hub.
    pub fn new(registry: Arc<SessionRegistry>, hub: Arc<ConnectionHub>) -> Self {
        Self {
            registry,
            hub,
            presence_gate: Mutex::new(()),
        }
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The connection hub.
    pub fn hub(&self) -> &Arc<ConnectionHub> {
        &self.hub
    }

    /// Register a username for `connection_id`.
    ///
    /// On success the requester gets `joined` and every connection gets a
    /// fresh presence snapshot. On failure only the requester hears about it.
    pub async fn handle_join(
        &self,
        connection_id: &ConnectionId,
        proposed: &str,
    ) -> Result<String, RelayError> {
        match self.registry.register(connection_id, proposed) {
            Ok(username) => {
                counter!(RELAY_JOINS_TOTAL).increment(1);
                info!(conn_id = %connection_id, username = %username, "user joined");
                let _ = self
                    .hub
                    .send_to(connection_id, &ServerEvent::Joined { username: username.clone() })
                    .await;
                self.broadcast_presence().await;
                Ok(username)
            }
            Err(err) => {
                let kind = err.kind().as_str();
                counter!(RELAY_JOIN_REJECTIONS_TOTAL, "code" => err.code(), "kind" => kind).increment(1);
                info!(conn_id = %connection_id, code = err.code(), kind, "join rejected");
                self.reject(connection_id, &err).await;
                Err(err)
            }
        }
    }

    /// Relay a direct message from the session on `sender`.
    ///
    /// The message is built once and the same serialized payload goes to the
    /// recipient and back to the sender. A message to oneself is delivered
    /// once.
    pub async fn handle_private_message(
        &self,
        sender: &ConnectionId,
        to: &str,
        body: &str,
    ) -> Result<PrivateMessage, RelayError> {
        let result = self.route_private_message(sender, to, body);
        match result {
            Ok((recipient, message)) => {
                counter!(RELAY_MESSAGES_TOTAL).increment(1);
                debug!(
                    conn_id = %sender,
                    from = %message.from,
                    to = %message.to,
                    message_id = %message.id,
                    "relaying private message"
                );
                let event = ServerEvent::PrivateMessage(message.clone());
                let targets: Vec<&ConnectionId> = if recipient == *sender {
                    vec![sender]
                } else {
                    vec![&recipient, sender]
                };
                let _ = self.hub.send_to_each(&targets, &event).await;
                Ok(message)
            }
            Err(err) => {
                let kind = err.kind().as_str();
                counter!(RELAY_MESSAGE_ERRORS_TOTAL, "code" => err.code(), "kind" => kind).increment(1);
                debug!(conn_id = %sender, code = err.code(), kind, "private message rejected");
                self.reject(sender, &err).await;
                Err(err)
            }
        }
    }

    fn route_private_message(
        &self,
        sender: &ConnectionId,
        to: &str,
        body: &str,
    ) -> Result<(ConnectionId, PrivateMessage), RelayError> {
        let from = self
            .registry
            .username_of(sender)
            .ok_or(RelayError::SenderUnknown)?;
        validate_body(body)?;
        let recipient = self
            .registry
            .resolve(to)
            .ok_or_else(|| RelayError::RecipientUnknown { username: to.to_owned() })?;
        Ok((recipient, PrivateMessage::new(from, to, body)))
    }

    /// Forward a typing notice to the recipient only.
    ///
    /// Unknown senders and recipients are ignored. Returns whether the notice
    /// was queued.
    pub async fn handle_typing(&self, sender: &ConnectionId, to: &str, is_typing: bool) -> bool {
        let Some(username) = self.registry.username_of(sender) else {
            debug!(conn_id = %sender, "typing from unjoined connection ignored");
            return false;
        };
        let Some(recipient) = self.registry.resolve(to) else {
            debug!(conn_id = %sender, to, "typing to unknown recipient ignored");
            return false;
        };
        counter!(RELAY_TYPING_TOTAL).increment(1);
        self.hub
            .send_to(&recipient, &ServerEvent::UserTyping { username, is_typing })
            .await
    }

    /// Drop the session bound to `connection_id`, if any.
    ///
    /// Remaining connections receive a fresh snapshot when a session existed.
    pub async fn handle_disconnect(&self, connection_id: &ConnectionId) -> Option<Session> {
        let session = self.registry.unregister(connection_id)?;
        info!(conn_id = %connection_id, username = %session.username, "user left");
        self.broadcast_presence().await;
        Some(session)
    }

    /// Push the current presence snapshot to every connection.
    pub async fn broadcast_presence(&self) {
        let _gate = self.presence_gate.lock().await;
        let snapshot = self.registry.snapshot();
        counter!(RELAY_PRESENCE_BROADCASTS_TOTAL).increment(1);
        debug!(online = snapshot.len(), "broadcasting presence");
        self.hub.broadcast_all(&ServerEvent::UsersUpdate(snapshot)).await;
    }

    /// Report a failure to the offending connection only.
    pub async fn reject(&self, connection_id: &ConnectionId, err: &RelayError) {
        if !self.hub.send_to(connection_id, &ServerEvent::from(err)).await {
            warn!(conn_id = %connection_id, code = err.code(), "could not report error to client");
        }
    }
}
