//! Unified error handling for ith.
//!
//! One error type per concern. Fatal startup errors (`ConnectionError`,
//! `HookError` during discovery) end the process; `BridgeError` and
//! `RpcError` are recovered per message and echoed back to the Discord author.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio_util::codec::AnyDelimiterCodecError;

// ============================================================================
// IRC errors
// ============================================================================

/// Errors raised while establishing the IRC connection.
///
/// Always fatal: the binary exits with a failure status.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to connect to {address}:{port}: {source}")]
    Io {
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to {address}:{port} after {timeout:?}")]
    Timeout {
        address: String,
        port: u16,
        timeout: Duration,
    },

    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    #[error("TLS handshake with {address} failed: {source}")]
    Tls {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("registration failed: {0}")]
    Registration(#[from] IrcError),
}

/// Errors raised by an established IRC session.
#[derive(Debug, Error)]
pub enum IrcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line longer than {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("IRC session is closed")]
    SessionClosed,

    #[error("IRC command queue is full")]
    QueueFull,

    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl From<AnyDelimiterCodecError> for IrcError {
    fn from(err: AnyDelimiterCodecError) -> Self {
        match err {
            AnyDelimiterCodecError::MaxChunkLengthExceeded => Self::LineTooLong {
                limit: crate::irc::MAX_IRC_LINE_LEN,
            },
            AnyDelimiterCodecError::Io(e) => Self::Io(e),
        }
    }
}

impl IrcError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::LineTooLong { .. } => "line_too_long",
            Self::SessionClosed => "session_closed",
            Self::QueueFull => "queue_full",
            Self::InvalidMessage(_) => "invalid_message",
        }
    }
}

// ============================================================================
// Hook errors
// ============================================================================

/// Errors from hook discovery, construction and lifecycle.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid plugin manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("plugin {name} exports unknown hook '{export}'")]
    UnknownExport { name: String, export: String },

    #[error("hook name '{0}' is already registered")]
    DuplicateName(String),

    #[error("hook configuration error: {0}")]
    Config(String),

    #[error("hook worker failed: {0}")]
    Worker(String),
}

// ============================================================================
// Bridge errors (per Discord message)
// ============================================================================

/// Errors while handling a single Discord message.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("could not queue message for IRC: {0}")]
    Submit(IrcError),

    #[error("IRC rejected the message: {0}")]
    Delivery(IrcError),

    #[error("IRC did not acknowledge the message within {0:?}")]
    AckTimeout(Duration),

    #[error("IRC session dropped the message")]
    AckDropped,

    #[error("you are not allowed to run commands")]
    Unauthorized,

    #[error("rpc failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("discord error: {0}")]
    Discord(#[from] serenity::Error),
}

impl BridgeError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Submit(_) => "submit",
            Self::Delivery(_) => "delivery",
            Self::AckTimeout(_) => "ack_timeout",
            Self::AckDropped => "ack_dropped",
            Self::Unauthorized => "unauthorized",
            Self::Rpc(_) => "rpc",
            Self::Discord(_) => "discord",
        }
    }
}

/// Errors from running an RPC script.
///
/// A non-zero exit code is not an error; it is reported in the transcript.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to prepare script: {0}")]
    Prepare(#[source] std::io::Error),

    #[error("failed to spawn script: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("script timed out after {0:?}")]
    Timeout(Duration),

    #[error("empty script")]
    Empty,
}
