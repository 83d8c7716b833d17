//! Per-message handling of Discord traffic, independent of the Discord client.

use super::codec::{AddressingCodec, SYNTAX_ERROR};
use super::dispatch::{CommandTable, Route};
use super::rpc::{self, RpcPolicy};
use crate::error::BridgeError;
use crate::message::InboundMessage;
use crate::supervisor::SupervisorHandle;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Tracing target for RPC invocations and denials.
pub const AUDIT_TARGET: &str = "ith::audit";

/// Somewhere to send a private reply.
#[async_trait]
pub trait ChatOutlet: Send + Sync {
    async fn reply_private(&self, text: &str) -> Result<(), BridgeError>;
}

/// Routes Discord messages to IRC or to the RPC runner.
pub struct BridgeCore {
    handle: SupervisorHandle,
    codec: AddressingCodec,
    table: CommandTable,
    rpc: RpcPolicy,
    ack_timeout: Duration,
}

impl BridgeCore {
    pub fn new(
        handle: SupervisorHandle,
        rpc: RpcPolicy,
        ack_timeout: Duration,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            handle,
            codec: AddressingCodec::new()?,
            table: CommandTable::new(&rpc)?,
            rpc,
            ack_timeout,
        })
    }

    /// Handle one Discord message, reporting any failure to its author.
    pub async fn handle(&self, message: &InboundMessage, outlet: &dyn ChatOutlet) {
        let result = match self.table.route(&message.body) {
            Route::Forward => self.forward_message(message, outlet).await,
            Route::Rpc => self.rpc(message, outlet).await,
        };

        if let Err(e) = result {
            error!(
                author = %message.sender,
                code = e.error_code(),
                error = %e,
                "Failed to handle Discord message"
            );
            if let Err(reply_err) = outlet.reply_private(&format!(":warning: {}", e)).await {
                warn!(error = %reply_err, "Failed to report error to Discord author");
            }
        }
    }

    /// Decode the addressing envelope and send the payload to IRC, waiting
    /// for the supervisor to confirm it was written.
    async fn forward_message(
        &self,
        message: &InboundMessage,
        outlet: &dyn ChatOutlet,
    ) -> Result<(), BridgeError> {
        let envelope = match self.codec.decode(&message.body, message.reply_to.as_ref()) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(author = %message.sender, error = %e, "Unaddressed Discord message");
                return outlet.reply_private(SYNTAX_ERROR).await;
            }
        };

        info!(
            author = %message.sender,
            target = %envelope.target,
            text = %envelope.payload,
            "DISCORD({}) > {:?} > IRC({})",
            message.sender,
            envelope.payload,
            envelope.target
        );

        let ack = self
            .handle
            .send_privmsg(&envelope.target, &envelope.payload)
            .map_err(BridgeError::Submit)?;

        match tokio::time::timeout(self.ack_timeout, ack).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(BridgeError::Delivery(e)),
            Ok(Err(_)) => Err(BridgeError::AckDropped),
            Err(_) => Err(BridgeError::AckTimeout(self.ack_timeout)),
        }
    }

    async fn rpc(&self, message: &InboundMessage, outlet: &dyn ChatOutlet) -> Result<(), BridgeError> {
        let allowed = message.sender_id.is_some_and(|id| self.rpc.is_allowed(id));
        if !allowed {
            warn!(
                target: AUDIT_TARGET,
                author = %message.sender,
                author_id = ?message.sender_id,
                "RPC denied"
            );
            return Err(BridgeError::Unauthorized);
        }

        let script = self.rpc.parse_script(&message.body)?;
        info!(
            target: AUDIT_TARGET,
            author = %message.sender,
            author_id = ?message.sender_id,
            script = %script,
            "RPC invoked"
        );

        let job = rpc::run_script(&script, &self.rpc).await?;
        info!(
            target: AUDIT_TARGET,
            author = %message.sender,
            exit_code = job.exit_code,
            "RPC finished"
        );
        outlet.reply_private(&job.transcript()).await
    }
}

/// Deliver queued IRC messages to `outlet` until the queue closes.
pub async fn drain_outbound<O: ChatOutlet>(mut outbound: mpsc::Receiver<String>, outlet: O) {
    while let Some(text) = outbound.recv().await {
        if let Err(e) = outlet.reply_private(&text).await {
            warn!(code = e.error_code(), error = %e, "Failed to deliver IRC message to Discord");
        }
    }
    debug!("Outbound queue closed");
}
