//! Session registry: the relay's single source of truth for who is online.
//!
//! Maps connection identity to username and back. All state sits behind one
//! exclusive lock, so every operation is linearizable: two racing `register`
//! calls for the same name cannot both succeed, and a snapshot never observes
//! a half-applied registration.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use murmur_core::validation::validate_username;
use murmur_core::{ConnectionId, PresenceEntry, RelayError};
use parking_lot::Mutex;

/// Binding between one live connection and its registered username.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Connection the session belongs to.
    pub connection_id: ConnectionId,
    /// Registered username (trimmed, immutable for the session's lifetime).
    pub username: String,
    /// When the join was accepted.
    pub joined_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Default)]
struct RegistryState {
    by_connection: HashMap<ConnectionId, Session>,
    by_username: HashMap<String, ConnectionId>,
    next_seq: u64,
}

/// Registry of active sessions.
#[derive(Default)]
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `proposed` for `connection_id`.
    ///
    /// Returns the username as registered (trimmed). Fails with
    /// `UsernameTooShort`/`UsernameTooLong` for bad lengths,
    /// `AlreadyJoined` if the connection already has a session, and
    /// `UsernameTaken` if any active session holds the name (exact,
    /// case-sensitive match). Failures leave the registry unchanged.
    pub fn register(
        &self,
        connection_id: &ConnectionId,
        proposed: &str,
    ) -> Result<String, RelayError> {
        let username = validate_username(proposed)?;

        let mut state = self.state.lock();
        if let Some(existing) = state.by_connection.get(connection_id) {
            return Err(RelayError::AlreadyJoined {
                username: existing.username.clone(),
            });
        }
        if state.by_username.contains_key(username) {
            return Err(RelayError::UsernameTaken);
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        let session = Session {
            connection_id: connection_id.clone(),
            username: username.to_owned(),
            joined_at: Utc::now(),
            seq,
        };
        let _ = state
            .by_username
            .insert(username.to_owned(), connection_id.clone());
        let _ = state.by_connection.insert(connection_id.clone(), session);
        Ok(username.to_owned())
    }

    /// Remove the session for `connection_id`, returning it if one existed.
    ///
    /// Idempotent: unknown connections are a no-op.
    pub fn unregister(&self, connection_id: &ConnectionId) -> Option<Session> {
        let mut state = self.state.lock();
        let session = state.by_connection.remove(connection_id)?;
        let _ = state.by_username.remove(&session.username);
        Some(session)
    }

    /// Connection currently registered under `username`.
    pub fn resolve(&self, username: &str) -> Option<ConnectionId> {
        self.state.lock().by_username.get(username).cloned()
    }

    /// Username registered for `connection_id`.
    pub fn username_of(&self, connection_id: &ConnectionId) -> Option<String> {
        self.state
            .lock()
            .by_connection
            .get(connection_id)
            .map(|s| s.username.clone())
    }

    /// Session for `connection_id`.
    pub fn session(&self, connection_id: &ConnectionId) -> Option<Session> {
        self.state.lock().by_connection.get(connection_id).cloned()
    }

    /// Presence snapshot, ordered by join time.
    pub fn snapshot(&self) -> Vec<PresenceEntry> {
        let state = self.state.lock();
        let mut sessions: Vec<&Session> = state.by_connection.values().collect();
        sessions.sort_by_key(|s| s.seq);
        sessions
            .into_iter()
            .map(|s| PresenceEntry::online(s.username.clone()))
            .collect()
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.state.lock().by_connection.len()
    }

    /// Whether no session is active.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
