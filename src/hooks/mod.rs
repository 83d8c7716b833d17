//! Hooks: pluggable components attached to the IRC session.
//!
//! - [`Hook`]: the lifecycle/event capability every hook implements
//! - [`loader`]: reads plugin manifests, cached by path
//! - [`catalog`]: maps a manifest's exported hook kind to a constructor
//! - [`registry`]: discovers, owns and drives hooks in registration order

pub mod catalog;
pub mod loader;
pub mod registry;

pub use catalog::{HookCatalog, HookFactory};
pub use loader::{PluginLoader, PluginModule};
pub use registry::{HookDescriptor, HookRegistry, Lifecycle};

use crate::error::HookError;
use crate::message::InboundMessage;
use crate::supervisor::{Connection, SupervisorHandle};
use async_trait::async_trait;

/// What a hook sees of the live connection when an event is delivered.
pub struct HookContext<'a> {
    pub connection: &'a Connection,
    /// Submits commands back to the IRC session.
    pub handle: &'a SupervisorHandle,
}

/// RPL_WELCOME, delivered once registration completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeEvent {
    pub server: String,
    pub text: String,
}

/// A component attached to the connection supervisor.
///
/// Events are delivered sequentially, in registration order, on the
/// supervisor's task: a hook that awaits for long stalls the IRC session.
/// Work that may take time belongs on the hook's own task or thread.
#[async_trait]
pub trait Hook: Send {
    /// Called once before the IRC session is driven.
    async fn start(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// Called once at shutdown, even if `start` failed.
    async fn stop(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// An inbound PRIVMSG that passed the post-connect grace window.
    async fn on_msg(&mut self, _ctx: &HookContext<'_>, _event: &InboundMessage) {}

    async fn on_welcome(&mut self, _ctx: &HookContext<'_>, _event: &WelcomeEvent) {}
}
