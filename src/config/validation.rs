//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("irc.nickname is required")]
    MissingNickname,
    #[error("irc.nickname must not contain spaces, got '{0}'")]
    InvalidNickname(String),
    #[error("irc.address is required")]
    MissingAddress,
    #[error("irc.port must be non-zero")]
    InvalidPort,
    #[error("irc.connect_timeout_secs must be non-zero")]
    InvalidConnectTimeout,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let irc = &config.irc;
    if irc.nickname.is_empty() {
        errors.push(ValidationError::MissingNickname);
    } else if irc.nickname.contains(char::is_whitespace) {
        errors.push(ValidationError::InvalidNickname(irc.nickname.clone()));
    }
    if irc.address.is_empty() {
        errors.push(ValidationError::MissingAddress);
    }
    if irc.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if irc.connect_timeout_secs == 0 {
        errors.push(ValidationError::InvalidConnectTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
