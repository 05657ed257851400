//! # murmur-client
//!
//! Client-side state for a murmur chat: per-peer conversation threads with
//! unread counts, the controller that decides what to show, a debounced
//! typing notifier, and the WebSocket link to the relay.
//!
//! Everything except [`typing`] and [`connection`] is synchronous; a client
//! processes one relay event at a time.

#![deny(unsafe_code)]

pub mod cache;
pub mod codec;
pub mod connection;
pub mod controller;
pub mod errors;
pub mod store;
pub mod typing;

pub use cache::ConversationCache;
pub use connection::{RelayConnection, RelayReceiver, RelaySender};
pub use controller::{ComposeError, ConversationController, TypingIndicator, ViewUpdate, unread_badge};
pub use errors::{ConnectError, StoreError};
pub use store::{ConversationStore, FileStore, MemoryStore, StoreKey};
pub use typing::TypingDebouncer;
