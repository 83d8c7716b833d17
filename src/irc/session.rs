//! Registered IRC session and event classification.

use super::{Command, Message, Prefix, Response, Transport};
use crate::error::IrcError;
use tracing::debug;

/// Payload bytes per outbound PRIVMSG, leaving room for the command, target
/// and the prefix the server prepends when relaying.
const MAX_PRIVMSG_PAYLOAD: usize = 400;

/// Inbound IRC traffic, as seen by the supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum IrcEvent {
    /// RPL_WELCOME: registration completed.
    Welcome { server: String, text: String },
    /// A PRIVMSG to us or to a channel we are in.
    PrivMsg {
        sender: String,
        target: String,
        text: String,
    },
    /// Server keepalive; must be answered with PONG.
    Ping(String),
    /// Server ERROR, usually right before it closes the link.
    Error(String),
    Other(Message),
}

fn source_name(prefix: &Prefix) -> String {
    match prefix {
        Prefix::ServerName(name) => name.clone(),
        Prefix::Nickname(nick, _, _) => nick.clone(),
    }
}

impl IrcEvent {
    /// Classify a parsed message.
    pub fn classify(msg: Message) -> Self {
        let event = match &msg.command {
            Command::Response(Response::RPL_WELCOME, args) => Some(IrcEvent::Welcome {
                server: msg.prefix.as_ref().map(source_name).unwrap_or_default(),
                text: args.last().cloned().unwrap_or_default(),
            }),
            Command::PRIVMSG(target, text) => Some(IrcEvent::PrivMsg {
                sender: msg
                    .prefix
                    .as_ref()
                    .map(source_name)
                    .unwrap_or_else(|| "*".to_string()),
                target: target.clone(),
                text: text.clone(),
            }),
            Command::PING(token, _) => Some(IrcEvent::Ping(token.clone())),
            Command::ERROR(reason) => Some(IrcEvent::Error(reason.clone())),
            _ => None,
        };
        match event {
            Some(event) => event,
            None => IrcEvent::Other(msg),
        }
    }
}

/// Split outbound text into PRIVMSG-sized pieces.
///
/// One piece per non-empty line; lines longer than the payload limit are cut
/// on character boundaries.
pub fn split_outbound(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let mut current = String::new();
        for ch in line.chars() {
            if current.len() + ch.len_utf8() > MAX_PRIVMSG_PAYLOAD {
                pieces.push(std::mem::take(&mut current));
            }
            current.push(ch);
        }
        if !current.is_empty() {
            pieces.push(current);
        }
    }
    pieces
}

/// A registered IRC client session.
pub struct IrcSession {
    transport: Transport,
}

impl IrcSession {
    /// Send PASS (if any), NICK and USER over a fresh transport.
    ///
    /// Does not wait for RPL_WELCOME; that arrives as an [`IrcEvent::Welcome`].
    pub async fn register(
        mut transport: Transport,
        nickname: &str,
        username: &str,
        password: Option<&str>,
    ) -> Result<Self, IrcError> {
        if let Some(password) = password {
            transport
                .write_message(&Command::PASS(password.to_string()).into())
                .await?;
        }
        transport
            .write_message(&Command::NICK(nickname.to_string()).into())
            .await?;
        transport
            .write_message(
                &Command::USER(username.to_string(), "0".to_string(), nickname.to_string())
                    .into(),
            )
            .await?;
        debug!(nick = %nickname, user = %username, "Registration sent");
        Ok(Self { transport })
    }

    /// Next inbound event, or `None` once the server closed the connection.
    ///
    /// Cancel-safe, so it can sit in a `select!` next to the command queue.
    pub async fn recv(&mut self) -> Result<Option<IrcEvent>, IrcError> {
        Ok(self
            .transport
            .read_message()
            .await?
            .map(IrcEvent::classify))
    }

    pub async fn pong(&mut self, token: &str) -> Result<(), IrcError> {
        self.transport
            .write_message(&Command::PONG(token.to_string(), None).into())
            .await
    }

    /// Send `text` to `target`, split over as many PRIVMSGs as needed.
    pub async fn privmsg(&mut self, target: &str, text: &str) -> Result<(), IrcError> {
        let pieces = split_outbound(text);
        if pieces.is_empty() {
            return Err(IrcError::InvalidMessage("empty message".to_string()));
        }
        for piece in pieces {
            self.transport
                .write_message(&Command::PRIVMSG(target.to_string(), piece).into())
                .await?;
        }
        Ok(())
    }

    /// Send QUIT and close the write half.
    pub async fn quit(&mut self, reason: Option<&str>) -> Result<(), IrcError> {
        self.transport
            .write_message(&Command::QUIT(reason.map(str::to_string)).into())
            .await?;
        self.transport.close().await
    }
}
