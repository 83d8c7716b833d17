//! Protocol-neutral inbound message.

/// Protocol a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Irc,
    Discord,
}

/// The message a Discord message replies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    /// Body of the referenced message.
    pub content: String,
    /// Whether the bridge's own Discord user wrote it.
    pub authored_by_bridge: bool,
}

/// A message received from either side of the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Display name of the sender (IRC nickname or Discord username).
    pub sender: String,
    /// Numeric sender id; Discord only.
    pub sender_id: Option<u64>,
    /// Recipient (our nickname or a channel); IRC only.
    pub target: Option<String>,
    pub body: String,
    pub reply_to: Option<ReplyContext>,
    pub origin: Origin,
}

impl InboundMessage {
    /// An IRC PRIVMSG.
    pub fn irc(sender: impl Into<String>, target: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            sender_id: None,
            target: Some(target.into()),
            body: body.into(),
            reply_to: None,
            origin: Origin::Irc,
        }
    }

    /// A Discord direct message.
    pub fn discord(sender: impl Into<String>, sender_id: u64, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            sender_id: Some(sender_id),
            target: None,
            body: body.into(),
            reply_to: None,
            origin: Origin::Discord,
        }
    }

    pub fn with_reply(mut self, reply_to: ReplyContext) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Whether an IRC message was sent to `nickname` (ASCII case-insensitive).
    pub fn is_addressed_to(&self, nickname: &str) -> bool {
        self.target
            .as_deref()
            .is_some_and(|target| target.eq_ignore_ascii_case(nickname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_addressed_to() {
        let msg = InboundMessage::irc("alice", "Ith", "hi");
        assert!(msg.is_addressed_to("ith"));
        assert!(!msg.is_addressed_to("other"));

        let channel = InboundMessage::irc("alice", "#rust", "hi");
        assert!(!channel.is_addressed_to("ith"));

        let discord = InboundMessage::discord("op", 1, "hi");
        assert!(!discord.is_addressed_to("ith"));
    }
}
