//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Fails if a global recorder
/// is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Open WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection lifetime in seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Outbound frames dropped on a full or closed queue (counter).
pub const WS_SEND_DROPS_TOTAL: &str = "ws_send_drops_total";
/// Accepted joins (counter).
pub const RELAY_JOINS_TOTAL: &str = "relay_joins_total";
/// Rejected joins (counter, labels: code).
pub const RELAY_JOIN_REJECTIONS_TOTAL: &str = "relay_join_rejections_total";
/// Relayed private messages (counter).
pub const RELAY_MESSAGES_TOTAL: &str = "relay_messages_total";
/// Rejected private messages (counter, labels: code).
pub const RELAY_MESSAGE_ERRORS_TOTAL: &str = "relay_message_errors_total";
/// Forwarded typing notices (counter).
pub const RELAY_TYPING_TOTAL: &str = "relay_typing_total";
/// Presence snapshots broadcast (counter).
pub const RELAY_PRESENCE_BROADCASTS_TOTAL: &str = "relay_presence_broadcasts_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_recorder_renders() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!(RELAY_MESSAGES_TOTAL).increment(2);
        });
        assert!(handle.render().contains("relay_messages_total 2"));
    }

    #[test]
    fn metric_names_are_snake_case() {
        let names = [
            WS_CONNECTIONS_TOTAL,
            WS_DISCONNECTIONS_TOTAL,
            WS_CONNECTIONS_ACTIVE,
            WS_CONNECTION_DURATION_SECONDS,
            WS_SEND_DROPS_TOTAL,
            RELAY_JOINS_TOTAL,
            RELAY_JOIN_REJECTIONS_TOTAL,
            RELAY_MESSAGES_TOTAL,
            RELAY_MESSAGE_ERRORS_TOTAL,
            RELAY_TYPING_TOTAL,
            RELAY_PRESENCE_BROADCASTS_TOTAL,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{name} is not snake_case"
            );
        }
    }
}
