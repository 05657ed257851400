//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the relay is running.
    pub status: String,
    /// Seconds since the relay started.
    pub uptime_secs: u64,
    /// Open WebSocket connections, joined or not.
    pub connections: usize,
    /// Connections with a registered username.
    pub online_users: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, connections: usize, online_users: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        online_users,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), 0, 0);
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn uptime_reflects_start_time() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        assert!(health_check(start, 0, 0).uptime_secs >= 59);
    }

    #[test]
    fn serializes_all_fields() {
        let json = serde_json::to_value(health_check(Instant::now(), 5, 3)).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["connections"], 5);
        assert_eq!(json["online_users"], 3);
        assert!(json["uptime_secs"].is_u64());
    }
}
