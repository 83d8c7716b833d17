//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`irc`]: IRC connection settings and the address/boolean parsers used by the CLI
//! - [`log`]: Log level and output format
//! - [`validation`]: Startup validation of the merged configuration
//!
//! A single [`Config`] value is built once in `main` (TOML file, then CLI and
//! environment overrides) and passed explicitly to every component.

mod irc;
mod log;
pub mod validation;

pub use irc::{IrcConfig, ServerAddress, parse_bool};
pub use log::{LogConfig, LogLevel};
pub use validation::{ValidationError, validate};

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Process configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// IRC connection.
    #[serde(default)]
    pub irc: IrcConfig,
    /// Hook discovery.
    #[serde(default)]
    pub hooks: HooksConfig,
    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
    /// Discord credentials shared by hooks that talk to Discord.
    #[serde(default)]
    pub discord: DiscordConfig,
}

/// Hook discovery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HooksConfig {
    /// Directory scanned for plugin manifests.
    #[serde(default = "default_hooks_directory")]
    pub directory: PathBuf,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            directory: default_hooks_directory(),
        }
    }
}

fn default_hooks_directory() -> PathBuf {
    PathBuf::from("hooks")
}

/// Discord credentials.
///
/// Usually supplied through `DISCORD_BOT_TOKEN` and `MY_DISCORD_ID`.
#[derive(Clone, Default, Deserialize)]
pub struct DiscordConfig {
    /// Bot token.
    pub token: Option<String>,
    /// User id of the operator who receives forwarded IRC messages.
    pub admin_id: Option<u64>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("admin_id", &self.admin_id)
            .finish()
    }
}

/// Values that override the file configuration, typically from the CLI.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub nickname: Option<String>,
    pub address: Option<ServerAddress>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Option<bool>,
    pub level: Option<LogLevel>,
    pub json_logs: bool,
    pub hooks_dir: Option<PathBuf>,
    pub discord_token: Option<String>,
    pub discord_admin_id: Option<u64>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply CLI/environment overrides on top of file values.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(nickname) = overrides.nickname {
            self.irc.nickname = nickname;
        }
        if let Some(address) = overrides.address {
            self.irc.address = address.host;
            self.irc.port = address.port;
        }
        if overrides.username.is_some() {
            self.irc.username = overrides.username;
        }
        if overrides.password.is_some() {
            self.irc.password = overrides.password;
        }
        if let Some(tls) = overrides.tls {
            self.irc.tls = tls;
        }
        if let Some(level) = overrides.level {
            self.log.level = level;
        }
        if overrides.json_logs {
            self.log.json = true;
        }
        if let Some(dir) = overrides.hooks_dir {
            self.hooks.directory = dir;
        }
        if overrides.discord_token.is_some() {
            self.discord.token = overrides.discord_token;
        }
        if overrides.discord_admin_id.is_some() {
            self.discord.admin_id = overrides.discord_admin_id;
        }
    }
}
