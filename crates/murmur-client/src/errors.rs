//! Client error types.

use std::path::PathBuf;

use thiserror::Error;

/// A conversation store could not be read or written.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// State could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The relay link failed.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// WebSocket handshake or transport failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// An event could not be encoded, or a frame from the relay could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
