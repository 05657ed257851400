//! Settings schema.
//!
//! Field names are snake_case in both the JSON file and the environment
//! (`MURMUR_SERVER__HEARTBEAT_INTERVAL_MS`).

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MurmurSettings {
    /// Relay network and runtime settings.
    pub server: ServerSettings,
    /// Chat client settings.
    pub client: ClientSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

impl MurmurSettings {
    /// Reject combinations the relay or client cannot run with.
    pub fn validate(&self) -> Result<()> {
        let server = &self.server;
        if server.heartbeat_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "server.heartbeat_interval_ms must be greater than zero".into(),
            ));
        }
        if server.heartbeat_timeout_ms < server.heartbeat_interval_ms {
            return Err(SettingsError::InvalidValue(format!(
                "server.heartbeat_timeout_ms ({}) is shorter than the interval ({})",
                server.heartbeat_timeout_ms, server.heartbeat_interval_ms
            )));
        }
        if server.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.max_connections must be greater than zero".into(),
            ));
        }
        if server.outbound_buffer == 0 || server.max_message_size == 0 {
            return Err(SettingsError::InvalidValue(
                "server buffer sizes must be greater than zero".into(),
            ));
        }
        if self.client.relay_url.trim().is_empty() {
            return Err(SettingsError::InvalidValue("client.relay_url is empty".into()));
        }
        Ok(())
    }
}

/// Relay network and runtime settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Interval between server pings, in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Silence after which a client is dropped, in milliseconds.
    pub heartbeat_timeout_ms: u64,
    /// Largest accepted inbound frame, in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound queue depth.
    pub outbound_buffer: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_connections: 1024,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            max_message_size: 64 * 1024,
            outbound_buffer: 256,
        }
    }
}

/// Chat client settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// WebSocket URL of the relay.
    pub relay_url: String,
    /// Directory for the conversation cache. Defaults to `~/.murmur/client`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Idle time before "stopped typing" is sent, in milliseconds.
    pub typing_idle_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:3000/ws".to_string(),
            data_dir: None,
            typing_idle_ms: 2_000,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive (`RUST_LOG` takes precedence).
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn server_defaults() {
        let s = ServerSettings::default();
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 3000);
        assert_eq!(s.heartbeat_interval_ms, 30_000);
        assert_eq!(s.heartbeat_timeout_ms, 90_000);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let s: MurmurSettings =
            serde_json::from_str(r#"{"server":{"port":8080}}"#).unwrap();
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.client, ClientSettings::default());
    }

    #[test]
    fn data_dir_omitted_when_unset() {
        let json = serde_json::to_value(ClientSettings::default()).unwrap();
        assert!(json.get("data_dir").is_none());
    }

    #[test]
    fn zero_heartbeat_rejected() {
        let mut s = MurmurSettings::default();
        s.server.heartbeat_interval_ms = 0;
        assert_matches!(s.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn timeout_shorter_than_interval_rejected() {
        let mut s = MurmurSettings::default();
        s.server.heartbeat_interval_ms = 10_000;
        s.server.heartbeat_timeout_ms = 5_000;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("shorter than the interval"));
    }

    #[test]
    fn empty_relay_url_rejected() {
        let mut s = MurmurSettings::default();
        s.client.relay_url = "  ".into();
        assert_matches!(s.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn zero_buffers_rejected() {
        let mut s = MurmurSettings::default();
        s.server.outbound_buffer = 0;
        assert!(s.validate().is_err());
    }
}
