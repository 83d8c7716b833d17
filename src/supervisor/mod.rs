//! Connection supervisor.
//!
//! Owns the IRC session and the hook registry. One task drives the session:
//! it reads inbound traffic, passes private messages through the
//! [`ForwardingGate`] and fans them out to hooks, and executes commands hooks
//! submit through their [`SupervisorHandle`].
//!
//! ```text
//! Supervisor::new ──discover_hooks──▶ connect ──▶ ConnectedSupervisor::run
//!                                                  start hooks
//!                                                  drive (select! read | commands | ctrl-c)
//!                                                  stop hooks
//! ```

mod connection;
mod gate;
mod handle;

pub use connection::Connection;
pub use gate::ForwardingGate;
pub use handle::{Ack, IrcCommand, SupervisorHandle};

use crate::config::Config;
use crate::error::{ConnectionError, HookError, IrcError};
use crate::hooks::{HookCatalog, HookContext, HookRegistry, PluginLoader, WelcomeEvent};
use crate::irc::{IrcEvent, IrcSession, Transport};
use crate::message::InboundMessage;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

/// Capacity of the hook → IRC command queue.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The server closed the connection or shutdown was requested.
    Disconnected,
    /// The session failed with an error or the drive loop panicked.
    Failed,
}

impl RunOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Disconnected => 0,
            RunOutcome::Failed => 1,
        }
    }
}

/// A supervisor that has not connected yet.
pub struct Supervisor {
    config: Config,
    hooks: HookRegistry,
    handle: SupervisorHandle,
    commands: mpsc::Receiver<IrcCommand>,
}

impl Supervisor {
    pub fn new(config: Config) -> Self {
        let (handle, commands) =
            SupervisorHandle::channel(config.irc.nickname.clone(), COMMAND_QUEUE_CAPACITY);
        Self {
            config,
            hooks: HookRegistry::new(),
            handle,
            commands,
        }
    }

    /// Handle hooks use to submit IRC commands.
    pub fn handle(&self) -> SupervisorHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// Register every plugin found in the configured hooks directory.
    pub fn discover_hooks(&mut self, catalog: &HookCatalog) -> Result<usize, HookError> {
        let mut loader = PluginLoader::new();
        let added = self.hooks.discover(
            &self.config.hooks.directory,
            &mut loader,
            catalog,
            &self.handle,
            &self.config,
        )?;
        info!(count = added, hooks = ?self.hooks.names(), "Hooks discovered");
        Ok(added)
    }

    /// Open the IRC connection and send registration.
    pub async fn connect(self) -> Result<ConnectedSupervisor, ConnectionError> {
        let irc = &self.config.irc;
        let transport =
            Transport::connect(&irc.address, irc.port, irc.tls, irc.connect_timeout()).await?;
        let session = IrcSession::register(
            transport,
            &irc.nickname,
            irc.username(),
            irc.password.as_deref(),
        )
        .await?;
        let connection = Connection::established(irc);

        info!(
            address = %connection.address,
            port = connection.port,
            nick = %connection.nickname,
            tls = connection.tls,
            at = %connection.connected_at_wall.to_rfc3339(),
            "Connected to {}:{} as {}",
            connection.address,
            connection.port,
            connection.nickname
        );

        Ok(ConnectedSupervisor {
            session,
            connection,
            hooks: self.hooks,
            handle: self.handle,
            commands: self.commands,
        })
    }
}

/// A supervisor with a registered IRC session, ready to run.
pub struct ConnectedSupervisor {
    session: IrcSession,
    connection: Connection,
    hooks: HookRegistry,
    handle: SupervisorHandle,
    commands: mpsc::Receiver<IrcCommand>,
}

impl ConnectedSupervisor {
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Start hooks, drive the session until it ends, then stop hooks.
    ///
    /// Hooks are stopped even when the drive loop errors or panics.
    pub async fn run(mut self) -> RunOutcome {
        self.hooks.start_all().await;

        let outcome = match AssertUnwindSafe(self.drive()).catch_unwind().await {
            Ok(Ok(())) => RunOutcome::Disconnected,
            Ok(Err(e)) => {
                error!(error = %e, code = e.error_code(), "IRC session failed");
                RunOutcome::Failed
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(reason = %reason, "IRC session panicked");
                RunOutcome::Failed
            }
        };

        self.hooks.stop_all().await;
        info!(outcome = ?outcome, "Supervisor stopped");
        outcome
    }

    async fn drive(&mut self) -> Result<(), IrcError> {
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = self.session.recv() => {
                    let Some(event) = event? else {
                        info!("Disconnected from server");
                        return Ok(());
                    };
                    self.handle_event(event).await?;
                }
                Some(command) = self.commands.recv() => {
                    if !self.execute(command).await? {
                        return Ok(());
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    self.quit(Some("Shutting down")).await;
                    return Ok(());
                }
            }
        }
    }

    async fn handle_event(&mut self, event: IrcEvent) -> Result<(), IrcError> {
        match event {
            IrcEvent::Welcome { server, text } => {
                info!(server = %server, "{}", text);
                let ctx = HookContext {
                    connection: &self.connection,
                    handle: &self.handle,
                };
                self.hooks
                    .dispatch_welcome(&ctx, &WelcomeEvent { server, text })
                    .await;
            }
            IrcEvent::PrivMsg {
                sender,
                target,
                text,
            } => {
                let message = InboundMessage::irc(sender, target, text);
                if !message.is_addressed_to(&self.connection.nickname) {
                    trace!(target = ?message.target, "Ignoring channel message");
                    return Ok(());
                }
                if !self.connection.admit(Instant::now()) {
                    debug!(sender = %message.sender, "Dropping message received during grace window");
                    return Ok(());
                }
                info!(
                    sender = %message.sender,
                    target = message.target.as_deref().unwrap_or_default(),
                    text = %message.body,
                    "IRC({}) > {:?}",
                    message.sender,
                    message.body
                );
                let ctx = HookContext {
                    connection: &self.connection,
                    handle: &self.handle,
                };
                self.hooks.dispatch_msg(&ctx, &message).await;
            }
            IrcEvent::Ping(token) => {
                trace!(token = %token, "PING");
                self.session.pong(&token).await?;
            }
            IrcEvent::Error(reason) => {
                error!(reason = %reason, "Server sent ERROR");
            }
            IrcEvent::Other(msg) => {
                trace!(command = ?msg.command, "Ignoring message");
            }
        }
        Ok(())
    }

    /// Execute a hook command. Returns `false` when the session should end.
    async fn execute(&mut self, command: IrcCommand) -> Result<bool, IrcError> {
        match command {
            IrcCommand::PrivMsg { target, text, ack } => {
                match self.session.privmsg(&target, &text).await {
                    Ok(()) => {
                        debug!(target = %target, "PRIVMSG sent");
                        acknowledge(ack, Ok(()));
                    }
                    Err(e @ IrcError::InvalidMessage(_)) => {
                        warn!(target = %target, error = %e, "Rejected outbound message");
                        acknowledge(ack, Err(e));
                    }
                    Err(e) => {
                        acknowledge(ack, Err(IrcError::SessionClosed));
                        return Err(e);
                    }
                }
                Ok(true)
            }
            IrcCommand::Quit { reason } => {
                self.quit(reason.as_deref()).await;
                Ok(false)
            }
        }
    }

    async fn quit(&mut self, reason: Option<&str>) {
        if let Err(e) = self.session.quit(reason).await {
            debug!(error = %e, "QUIT not delivered");
        }
    }
}

fn acknowledge(ack: Option<oneshot::Sender<Ack>>, result: Ack) {
    if let Some(ack) = ack {
        // The submitter may have given up waiting.
        let _ = ack.send(result);
    }
}
