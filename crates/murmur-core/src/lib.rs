//! # murmur-core
//!
//! Shared vocabulary for the murmur relay and its clients:
//!
//! - **Branded IDs**: `ConnectionId`, `MessageId` as newtypes over UUID v7 strings
//! - **Protocol**: [`ClientEvent`] / [`ServerEvent`] wire enums, [`PrivateMessage`],
//!   [`PresenceEntry`]
//! - **Errors**: [`RelayError`] taxonomy with machine-readable codes
//! - **Validation**: username and message body rules used on both sides of the wire

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod ids;
pub mod protocol;
pub mod validation;

pub use errors::{ErrorKind, RelayError};
pub use ids::{ConnectionId, MessageId};
pub use protocol::{ClientEvent, PresenceEntry, PresenceStatus, PrivateMessage, ServerEvent};
