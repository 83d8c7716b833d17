//! Discord event handler for serenity.

use super::relay::{BridgeCore, ChatOutlet, drain_outbound};
use crate::error::BridgeError;
use crate::message::{InboundMessage, ReplyContext};
use parking_lot::Mutex;
use serenity::all::{
    Context, CreateMessage, EventHandler, GatewayIntents, Message, Ready, User, UserId,
};
use serenity::async_trait;
use serenity::http::Http;
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Sent to the administrator each time the bot becomes ready.
pub const RECONNECTED: &str = ":bell: Reconnected";

/// Direct messages to one Discord user.
pub struct DiscordOutlet {
    http: Arc<Http>,
    user: User,
}

impl DiscordOutlet {
    pub fn new(http: Arc<Http>, user: User) -> Self {
        Self { http, user }
    }
}

#[async_trait]
impl ChatOutlet for DiscordOutlet {
    async fn reply_private(&self, text: &str) -> Result<(), BridgeError> {
        self.user
            .direct_message(self.http.as_ref(), CreateMessage::new().content(text))
            .await?;
        Ok(())
    }
}

/// Handler for Discord gateway events.
pub struct BridgeHandler {
    core: Arc<BridgeCore>,
    admin_id: UserId,
    /// IRC → Discord queue; taken once the administrator is resolved.
    outbound: Arc<Mutex<Option<mpsc::Receiver<String>>>>,
    bot_id: OnceLock<UserId>,
}

impl BridgeHandler {
    pub fn new(
        core: Arc<BridgeCore>,
        admin_id: UserId,
        outbound: Arc<Mutex<Option<mpsc::Receiver<String>>>>,
    ) -> Self {
        Self {
            core,
            admin_id,
            outbound,
            bot_id: OnceLock::new(),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::DIRECT_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }

    fn is_own(&self, user: &User) -> bool {
        self.bot_id.get() == Some(&user.id)
    }
}

#[async_trait]
impl EventHandler for BridgeHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let _ = self.bot_id.set(ready.user.id);
        info!(bot_name = %ready.user.name, "Discord bot ready");

        let admin = match self.admin_id.to_user(&ctx).await {
            Ok(user) => user,
            Err(e) => {
                error!(admin_id = %self.admin_id, error = %e, "Failed to resolve Discord administrator");
                return;
            }
        };

        let outlet = DiscordOutlet::new(ctx.http.clone(), admin);
        if let Err(e) = outlet.reply_private(RECONNECTED).await {
            warn!(error = %e, "Failed to notify administrator");
        }

        let Some(outbound) = self.outbound.lock().take() else {
            debug!("Outbound relay already running");
            return;
        };
        tokio::spawn(drain_outbound(outbound, outlet));
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if self.is_own(&msg.author) || msg.guild_id.is_some() {
            return;
        }

        let mut inbound =
            InboundMessage::discord(msg.author.name.clone(), msg.author.id.get(), msg.content.clone());
        if let Some(referenced) = msg.referenced_message.as_deref() {
            inbound = inbound.with_reply(ReplyContext {
                content: referenced.content.clone(),
                authored_by_bridge: self.is_own(&referenced.author),
            });
        }

        let outlet = DiscordOutlet::new(ctx.http.clone(), msg.author.clone());
        self.core.handle(&inbound, &outlet).await;
    }
}
