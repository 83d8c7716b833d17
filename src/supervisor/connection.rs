//! State of the live IRC connection.

use super::gate::ForwardingGate;
use crate::config::IrcConfig;
use chrono::{DateTime, Utc};
use std::time::Instant;

/// The connection the supervisor drives. Dropped on disconnect.
#[derive(Debug)]
pub struct Connection {
    pub address: String,
    pub port: u16,
    pub nickname: String,
    pub username: String,
    pub(crate) password: Option<String>,
    pub tls: bool,
    /// Monotonic connect time; the gate measures from here.
    pub connected_at: Instant,
    /// Wall-clock connect time, for logs.
    pub connected_at_wall: DateTime<Utc>,
    pub(crate) gate: ForwardingGate,
}

impl Connection {
    /// Record a connection that was just established.
    pub fn established(config: &IrcConfig) -> Self {
        let connected_at = Instant::now();
        Self {
            address: config.address.clone(),
            port: config.port,
            nickname: config.nickname.clone(),
            username: config.username().to_string(),
            password: config.password.clone(),
            tls: config.tls,
            connected_at,
            connected_at_wall: Utc::now(),
            gate: ForwardingGate::new(connected_at, config.grace_window()),
        }
    }

    /// Whether messages are being delivered to hooks yet.
    pub fn is_forwarding(&self) -> bool {
        self.gate.is_forwarding()
    }

    /// Pass an inbound message observed at `now` through the gate.
    pub fn admit(&mut self, now: Instant) -> bool {
        self.gate.admit(now)
    }

    #[cfg(test)]
    pub(crate) fn for_tests(nickname: &str) -> Self {
        let config = IrcConfig {
            address: "irc.example.net".into(),
            nickname: nickname.into(),
            grace_window_ms: 0,
            ..IrcConfig::default()
        };
        Self::established(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_established_from_config() {
        let config = IrcConfig {
            address: "irc.example.net".into(),
            port: 6667,
            nickname: "ith".into(),
            password: Some("secret".into()),
            tls: false,
            grace_window_ms: 2000,
            ..IrcConfig::default()
        };
        let mut conn = Connection::established(&config);

        assert_eq!(conn.username, "ith");
        assert_eq!(conn.password.as_deref(), Some("secret"));
        assert!(!conn.is_forwarding());
        assert!(!conn.admit(conn.connected_at + Duration::from_millis(500)));
        assert!(conn.admit(conn.connected_at + Duration::from_secs(2)));
        assert!(conn.is_forwarding());
    }
}
