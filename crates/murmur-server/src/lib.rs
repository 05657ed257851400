//! # murmur-server
//!
//! The murmur relay: session registry, message routing, and the Axum
//! WebSocket gateway that fronts them.
//!
//! - [`registry::SessionRegistry`]: connection to username binding, one lock
//! - [`router::MessageRouter`]: joins, direct messages, typing, presence
//! - [`websocket`]: per-connection sessions, heartbeat, outbound fan-out
//! - [`server::RelayServer`]: `/ws`, `/health`, `/metrics`, graceful shutdown

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod registry;
pub mod router;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use router::MessageRouter;
pub use server::RelayServer;
