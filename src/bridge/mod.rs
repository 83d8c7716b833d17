//! Discord bridge hook.
//!
//! Relays private messages between the IRC session and one Discord
//! administrator. The Discord client runs on its own current-thread runtime
//! on a dedicated worker thread; the two sides only meet through bounded
//! channels:
//!
//! - IRC → Discord: `on_msg` encodes the message and `try_send`s it onto the
//!   outbound queue, drained on the Discord runtime once the bot is ready.
//! - Discord → IRC: the event handler submits a PRIVMSG through the
//!   [`SupervisorHandle`] and awaits its acknowledgment.

pub mod codec;
pub mod dispatch;
pub mod handler;
pub mod relay;
pub mod rpc;

pub use codec::{AddressingCodec, AddressingEnvelope, DecodeError, SYNTAX_ERROR};
pub use dispatch::{CommandTable, Route};
pub use handler::{BridgeHandler, DiscordOutlet, RECONNECTED};
pub use relay::{AUDIT_TARGET, BridgeCore, ChatOutlet};
pub use rpc::{RpcJob, RpcPolicy};

use crate::config::Config;
use crate::error::HookError;
use crate::hooks::{Hook, HookContext, PluginModule};
use crate::message::InboundMessage;
use crate::supervisor::SupervisorHandle;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serenity::Client;
use serenity::all::UserId;
use std::future::IntoFuture;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Name of the worker thread running the Discord client.
const WORKER_THREAD: &str = "discord-bridge";

/// How long the worker waits for leftover Discord tasks after the client ends.
const WORKER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Options read from the plugin manifest's `[options]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeOptions {
    /// IRC messages queued while Discord is not ready.
    pub outbound_capacity: usize,
    /// How long to wait for IRC to confirm a forwarded message.
    pub ack_timeout_secs: u64,
    pub rpc: RpcPolicy,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            outbound_capacity: 64,
            ack_timeout_secs: 10,
            rpc: RpcPolicy::default(),
        }
    }
}

impl BridgeOptions {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs.max(1))
    }
}

struct Worker {
    thread: JoinHandle<()>,
    shutdown: Option<oneshot::Sender<()>>,
}

/// The Discord bridge hook.
pub struct DiscordBridge {
    token: String,
    admin_id: UserId,
    core: Arc<BridgeCore>,
    outbound: mpsc::Sender<String>,
    pending: Arc<Mutex<Option<mpsc::Receiver<String>>>>,
    worker: Option<Worker>,
}

impl DiscordBridge {
    /// Hook kind plugin manifests name to get this hook.
    pub const EXPORT: &'static str = "discord-bridge";

    /// Build the bridge from explicit credentials and options.
    pub fn new(
        token: String,
        admin_id: u64,
        options: BridgeOptions,
        handle: SupervisorHandle,
    ) -> Result<Self, HookError> {
        if token.trim().is_empty() {
            return Err(HookError::Config("Discord bot token is empty".into()));
        }
        if admin_id == 0 {
            return Err(HookError::Config("Discord administrator id must be non-zero".into()));
        }
        if options.rpc.enabled && options.rpc.allowed_users.is_empty() {
            warn!("RPC is enabled but no Discord users are allowed to run it");
        }

        let core = BridgeCore::new(handle, options.rpc.clone(), options.ack_timeout())
            .map_err(|e| HookError::Config(e.to_string()))?;
        let (outbound, pending) = mpsc::channel(options.outbound_capacity.max(1));

        Ok(Self {
            token,
            admin_id: UserId::new(admin_id),
            core: Arc::new(core),
            outbound,
            pending: Arc::new(Mutex::new(Some(pending))),
            worker: None,
        })
    }

    /// Catalog factory: credentials from the process config, options from
    /// the manifest.
    pub fn from_plugin(
        module: &PluginModule,
        handle: &SupervisorHandle,
        config: &Config,
    ) -> Result<Box<dyn Hook>, HookError> {
        let options: BridgeOptions = module.options()?;
        let token = config.discord.token.clone().ok_or_else(|| {
            HookError::Config("DISCORD_BOT_TOKEN is not set".into())
        })?;
        let admin_id = config
            .discord
            .admin_id
            .ok_or_else(|| HookError::Config("MY_DISCORD_ID is not set".into()))?;

        debug!(plugin = %module.name, options = ?options, "Creating Discord bridge");
        Ok(Box::new(Self::new(token, admin_id, options, handle.clone())?))
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

#[async_trait]
impl Hook for DiscordBridge {
    async fn start(&mut self) -> Result<(), HookError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let handler = BridgeHandler::new(
            Arc::clone(&self.core),
            self.admin_id,
            Arc::clone(&self.pending),
        );
        let token = self.token.clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD.to_string())
            .spawn(move || run_worker(token, handler, shutdown_rx))
            .map_err(|e| HookError::Worker(e.to_string()))?;

        self.worker = Some(Worker {
            thread,
            shutdown: Some(shutdown_tx),
        });
        info!("Discord bridge started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), HookError> {
        let Some(mut worker) = self.worker.take() else {
            return Ok(());
        };
        if let Some(shutdown) = worker.shutdown.take() {
            // The worker may already be gone if the client failed.
            let _ = shutdown.send(());
        }

        tokio::task::spawn_blocking(move || worker.thread.join())
            .await
            .map_err(|e| HookError::Worker(e.to_string()))?
            .map_err(|_| HookError::Worker("Discord worker thread panicked".into()))?;
        info!("Discord bridge stopped");
        Ok(())
    }

    async fn on_msg(&mut self, ctx: &HookContext<'_>, event: &InboundMessage) {
        if !event.is_addressed_to(&ctx.connection.nickname) {
            return;
        }

        let text = codec::encode(&event.sender, &event.body);
        match self.outbound.try_send(text) {
            Ok(()) => debug!(sender = %event.sender, "Queued message for Discord"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(sender = %event.sender, "Discord queue full, dropping message")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(sender = %event.sender, "Discord relay is not running, dropping message")
            }
        }
    }
}

/// Body of the worker thread: run the Discord client until it fails or
/// `shutdown` fires.
fn run_worker(token: String, handler: BridgeHandler, mut shutdown: oneshot::Receiver<()>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to build Discord runtime");
            return;
        }
    };

    runtime.block_on(async move {
        let builder = Client::builder(&token, BridgeHandler::intents()).event_handler(handler);
        let mut client = tokio::select! {
            built = builder.into_future() => match built {
                Ok(client) => client,
                Err(e) => {
                    error!(error = %e, "Failed to create Discord client");
                    return;
                }
            },
            _ = &mut shutdown => return,
        };

        let shards = client.shard_manager.clone();
        tokio::select! {
            result = client.start() => {
                if let Err(e) = result {
                    error!(error = %e, "Discord client stopped with an error");
                }
            }
            // Before the first shard connects there is no runner to signal,
            // so the start future is dropped here rather than awaited.
            _ = &mut shutdown => {
                debug!("Shutting down Discord shards");
                shards.shutdown_all().await;
            }
        }
    });
    runtime.shutdown_timeout(WORKER_SHUTDOWN_GRACE);
}
