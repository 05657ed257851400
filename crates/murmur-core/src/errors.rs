//! Relay error taxonomy.
//!
//! Every failure the relay reports to a client is a [`RelayError`]. Its
//! `Display` output is the human-readable text sent in the `error` event;
//! [`RelayError::code`] is the stable machine-readable form used in logs and
//! metrics labels.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{USERNAME_MAX_CHARS, USERNAME_MIN_CHARS};

/// Classification of a [`RelayError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input (bad username length, empty body, unparsable event).
    Validation,
    /// The request collides with existing state (name taken, already joined).
    Conflict,
    /// A referenced participant has no live session.
    NotFound,
}

impl ErrorKind {
    /// Snake-case name, used as a log field and metrics label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported back to the connection that caused them.
///
/// None of these are fatal to the relay: each aborts a single operation for
/// a single connection and leaves registry state untouched.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Trimmed username is shorter than the minimum.
    #[error("Username must be at least {} characters", USERNAME_MIN_CHARS)]
    UsernameTooShort,

    /// Trimmed username is longer than the maximum.
    #[error("Username must be at most {} characters", USERNAME_MAX_CHARS)]
    UsernameTooLong,

    /// Another active session holds this username.
    #[error("Username already taken")]
    UsernameTaken,

    /// The connection already has a session.
    #[error("Already joined as {username}")]
    AlreadyJoined {
        /// Name the connection is registered under.
        username: String,
    },

    /// Message body is empty after trimming.
    #[error("Message cannot be empty")]
    EmptyMessage,

    /// The sending connection has no session (never joined, or raced a disconnect).
    #[error("Sender not found")]
    SenderUnknown,

    /// The addressed username has no live session.
    #[error("Recipient not found")]
    RecipientUnknown {
        /// Username that failed to resolve.
        username: String,
    },

    /// A frame could not be decoded as a client event.
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

impl RelayError {
    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UsernameTooShort => "USERNAME_TOO_SHORT",
            Self::UsernameTooLong => "USERNAME_TOO_LONG",
            Self::UsernameTaken => "USERNAME_TAKEN",
            Self::AlreadyJoined { .. } => "ALREADY_JOINED",
            Self::EmptyMessage => "EMPTY_MESSAGE",
            Self::SenderUnknown => "SENDER_UNKNOWN",
            Self::RecipientUnknown { .. } => "RECIPIENT_UNKNOWN",
            Self::InvalidEvent(_) => "INVALID_EVENT",
        }
    }

    /// Error classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UsernameTooShort
            | Self::UsernameTooLong
            | Self::EmptyMessage
            | Self::InvalidEvent(_) => ErrorKind::Validation,
            Self::UsernameTaken | Self::AlreadyJoined { .. } => ErrorKind::Conflict,
            Self::SenderUnknown | Self::RecipientUnknown { .. } => ErrorKind::NotFound,
        }
    }
}
