//! IRC connection configuration.

use super::ConfigError;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// IRC connection settings.
#[derive(Clone, Deserialize)]
pub struct IrcConfig {
    /// Server host name.
    #[serde(default)]
    pub address: String,
    /// Server port (default: 6697).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Nickname to register with.
    #[serde(default)]
    pub nickname: String,
    /// Username for USER; defaults to the nickname.
    pub username: Option<String>,
    /// Server password sent with PASS, if any.
    pub password: Option<String>,
    /// Connect over TLS (default: true).
    #[serde(default = "default_tls")]
    pub tls: bool,
    /// Seconds allowed for TCP connect and TLS handshake (default: 30).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Milliseconds after connect during which inbound private messages are
    /// dropped to avoid replaying server backlog (default: 2000).
    #[serde(default = "default_grace_window")]
    pub grace_window_ms: u64,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: default_port(),
            nickname: String::new(),
            username: None,
            password: None,
            tls: default_tls(),
            connect_timeout_secs: default_connect_timeout(),
            grace_window_ms: default_grace_window(),
        }
    }
}

impl std::fmt::Debug for IrcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrcConfig")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("nickname", &self.nickname)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("tls", &self.tls)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("grace_window_ms", &self.grace_window_ms)
            .finish()
    }
}

impl IrcConfig {
    /// Username sent with USER.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nickname)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn grace_window(&self) -> Duration {
        Duration::from_millis(self.grace_window_ms)
    }
}

fn default_port() -> u16 {
    6697
}

fn default_tls() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_grace_window() -> u64 {
    2000
}

/// A server address given as `host:port` or `host/port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl FromStr for ServerAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split on the last separator so IPv6-ish hosts keep their colons.
        let idx = s
            .rfind([':', '/'])
            .ok_or_else(|| ConfigError::Invalid(format!("expected <host:port>, got '{s}'")))?;
        let (host, port) = (&s[..idx], &s[idx + 1..]);
        if host.is_empty() {
            return Err(ConfigError::Invalid(format!("missing host in '{s}'")));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid(format!("invalid port in '{s}'")))?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

/// Parse a yes/no flag (`y`, `yes`, `true`, `on` / `n`, `no`, `false`, `off`).
pub fn parse_bool(s: &str) -> Result<bool, ConfigError> {
    match s.to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "on" => Ok(true),
        "n" | "no" | "false" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(format!("expected yes/no, got '{s}'"))),
    }
}
