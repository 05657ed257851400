//! Wire protocol between clients and the relay.
//!
//! Every WebSocket text frame carries exactly one event encoded as
//! `{"type": "<eventName>", "data": <payload>}`. Event names and payload
//! fields are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::RelayError;
use crate::ids::{ConnectionId, MessageId};

/// Presence state of a listed user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// Connected and joined.
    #[default]
    Online,
}

/// One row of a presence snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    /// Registered username.
    pub username: String,
    /// Presence state.
    pub status: PresenceStatus,
}

impl PresenceEntry {
    /// An online entry for `username`.
    pub fn online(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            status: PresenceStatus::Online,
        }
    }
}

/// A relayed direct message. Immutable once built by the relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessage {
    /// Time-ordered display key.
    pub id: MessageId,
    /// Sender's registered username.
    pub from: String,
    /// Recipient's username.
    pub to: String,
    /// Message body, relayed verbatim.
    pub message: String,
    /// When the relay accepted the message.
    pub timestamp: DateTime<Utc>,
}

impl PrivateMessage {
    /// Build a message stamped with a fresh ID and the current time.
    pub fn new(from: impl Into<String>, to: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            from: from.into(),
            to: to.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// The other participant, as seen by `me`.
    ///
    /// A message addressed to `me` belongs to the sender's thread; anything
    /// else (including the relay's echo of our own message) belongs to the
    /// recipient's thread.
    #[must_use]
    pub fn peer_of(&self, me: &str) -> &str {
        if self.to == me { &self.from } else { &self.to }
    }
}

/// Events sent by a client to the relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Register a display name for this connection.
    Join {
        /// Proposed username.
        username: String,
    },
    /// Send a direct message.
    PrivateMessage {
        /// Recipient username.
        to: String,
        /// Message body.
        message: String,
    },
    /// Typing started or stopped.
    Typing {
        /// Recipient username.
        to: String,
        /// Whether the sender is currently typing.
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}

impl ClientEvent {
    /// Decode one frame.
    pub fn from_json(text: &str) -> Result<Self, RelayError> {
        serde_json::from_str(text).map_err(|e| RelayError::InvalidEvent(e.to_string()))
    }

    /// Event name as it appears on the wire.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::PrivateMessage { .. } => "privateMessage",
            Self::Typing { .. } => "typing",
        }
    }
}

/// Events sent by the relay to a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Sent once after the WebSocket upgrade.
    Connected {
        /// Identity the relay assigned to this connection.
        #[serde(rename = "connectionId")]
        connection_id: ConnectionId,
    },
    /// Join accepted.
    Joined {
        /// Registered username.
        username: String,
    },
    /// An operation requested by this connection failed.
    Error {
        /// Human-readable reason.
        message: String,
    },
    /// A direct message, delivered to both participants.
    PrivateMessage(PrivateMessage),
    /// A peer started or stopped typing to us.
    UserTyping {
        /// Who is typing.
        username: String,
        /// Whether they are typing.
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
    /// Full presence snapshot.
    UsersUpdate(Vec<PresenceEntry>),
}

impl ServerEvent {
    /// Event name as it appears on the wire.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Joined { .. } => "joined",
            Self::Error { .. } => "error",
            Self::PrivateMessage(_) => "privateMessage",
            Self::UserTyping { .. } => "userTyping",
            Self::UsersUpdate(_) => "usersUpdate",
        }
    }

    /// Encode as a single frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&RelayError> for ServerEvent {
    fn from(err: &RelayError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::{Value, json};

    #[test]
    fn join_wire_shape() {
        let event = ClientEvent::from_json(r#"{"type":"join","data":{"username":"alice"}}"#).unwrap();
        assert_eq!(event, ClientEvent::Join { username: "alice".into() });
        assert_eq!(event.name(), "join");
    }

    #[test]
    fn typing_uses_camel_case_flag() {
        let event = ClientEvent::from_json(
            r#"{"type":"typing","data":{"to":"bob","isTyping":true}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::Typing { to: "bob".into(), is_typing: true }
        );
    }

    #[test]
    fn private_message_request_shape() {
        let event = ClientEvent::from_json(
            r#"{"type":"privateMessage","data":{"to":"bob","message":"hi"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::PrivateMessage { to: "bob".into(), message: "hi".into() }
        );
    }

    #[test]
    fn malformed_frames_are_invalid_events() {
        assert_matches!(ClientEvent::from_json("not json"), Err(RelayError::InvalidEvent(_)));
        assert_matches!(
            ClientEvent::from_json(r#"{"type":"shout","data":{}}"#),
            Err(RelayError::InvalidEvent(_))
        );
        assert_matches!(
            ClientEvent::from_json(r#"{"type":"privateMessage","data":{"to":"bob"}}"#),
            Err(RelayError::InvalidEvent(_))
        );
    }

    #[test]
    fn private_message_event_shape() {
        let msg = PrivateMessage::new("alice", "bob", "hello");
        let json: Value = serde_json::from_str(&ServerEvent::PrivateMessage(msg.clone()).to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "privateMessage");
        assert_eq!(json["data"]["from"], "alice");
        assert_eq!(json["data"]["to"], "bob");
        assert_eq!(json["data"]["message"], "hello");
        assert_eq!(json["data"]["id"], msg.id.as_str());
        assert!(json["data"]["timestamp"].is_string());
    }

    #[test]
    fn users_update_is_a_plain_list() {
        let event = ServerEvent::UsersUpdate(vec![
            PresenceEntry::online("alice"),
            PresenceEntry::online("bob"),
        ]);
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "usersUpdate",
                "data": [
                    {"username": "alice", "status": "online"},
                    {"username": "bob", "status": "online"}
                ]
            })
        );
    }

    #[test]
    fn user_typing_shape() {
        let event = ServerEvent::UserTyping { username: "alice".into(), is_typing: false };
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json, json!({"type": "userTyping", "data": {"username": "alice", "isTyping": false}}));
    }

    #[test]
    fn error_event_from_relay_error() {
        let event = ServerEvent::from(&RelayError::UsernameTaken);
        assert_eq!(event, ServerEvent::Error { message: "Username already taken".into() });
        assert_eq!(event.name(), "error");
    }

    #[test]
    fn connected_carries_connection_id() {
        let event = ServerEvent::Connected { connection_id: ConnectionId::from("c-1") };
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json, json!({"type": "connected", "data": {"connectionId": "c-1"}}));
    }

    #[test]
    fn peer_of_maps_echo_to_recipient() {
        let msg = PrivateMessage::new("alice", "bob", "hi");
        assert_eq!(msg.peer_of("alice"), "bob");
        assert_eq!(msg.peer_of("bob"), "alice");
    }

    #[test]
    fn server_event_roundtrips_for_clients() {
        let msg = PrivateMessage::new("alice", "bob", "hi");
        let text = ServerEvent::PrivateMessage(msg.clone()).to_json().unwrap();
        let back: ServerEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back, ServerEvent::PrivateMessage(msg));
    }
}
