//! ith - IRC to Discord private message bridge.
//!
//! A single IRC session is supervised by [`supervisor::Supervisor`]; hooks
//! discovered from plugin manifests attach to it. The built-in
//! [`bridge::DiscordBridge`] hook relays private messages to one Discord
//! administrator and back.

pub mod bridge;
pub mod config;
pub mod error;
pub mod hooks;
pub mod irc;
pub mod message;
pub mod supervisor;
