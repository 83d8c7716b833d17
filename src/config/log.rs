//! Logging configuration.

use super::ConfigError;
use serde::Deserialize;
use std::str::FromStr;

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Minimum level (default: INFO). Overridden by `RUST_LOG`.
    #[serde(default)]
    pub level: LogLevel,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Log level names accepted on the command line and in the config file.
///
/// `WARNING` and `CRITICAL` are accepted as aliases for `warn` and `error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(ConfigError::Invalid(format!("unknown log level '{s}'"))),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, ConfigError> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_aliases() {
        assert_eq!("warning".parse::<LogLevel>().unwrap().directive(), "warn");
        assert_eq!("CRITICAL".parse::<LogLevel>().unwrap().directive(), "error");
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!(matches!(
            LogLevel::try_from("error".to_string()),
            Ok(LogLevel::Error)
        ));
    }

    #[test]
    fn test_level_from_toml() {
        let config: LogConfig = toml::from_str("level = \"DEBUG\"").unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.json);
    }
}
