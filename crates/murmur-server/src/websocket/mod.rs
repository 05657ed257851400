//! WebSocket connection management, heartbeat, frame dispatch, and fan-out.

pub mod connection;
pub mod handler;
pub mod heartbeat;
pub mod hub;
pub mod session;
