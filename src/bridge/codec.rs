//! Addressing envelope carried in Discord message text.
//!
//! IRC messages reach Discord as `` #<nick>: `<text>` ``. The operator answers
//! either by replying to one of those messages, or by writing
//! `#<nick> <text>` explicitly.

use crate::message::ReplyContext;
use regex::Regex;
use thiserror::Error;

/// Sent to the author when a message carries no usable address.
pub const SYNTAX_ERROR: &str = "Syntax error, you must send messages with `#<nickname> <message>`";

/// Where a Discord message should go on IRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressingEnvelope {
    pub target: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("message is not addressed to an IRC nickname")]
pub struct DecodeError;

/// Replace every run of line breaks with `". "`.
pub fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_break = false;
    for ch in text.chars() {
        if ch == '\r' || ch == '\n' {
            if !in_break {
                out.push_str(". ");
                in_break = true;
            }
        } else {
            out.push(ch);
            in_break = false;
        }
    }
    out
}

/// Encode an IRC message for Discord.
pub fn encode(sender: &str, text: &str) -> String {
    format!("#{}: `{}`", sender, collapse_newlines(text))
}

/// Compiled envelope patterns.
#[derive(Debug, Clone)]
pub struct AddressingCodec {
    bridge_message: Regex,
    explicit: Regex,
}

impl AddressingCodec {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            bridge_message: Regex::new(r"^#(\S+):\s+`(?s:.*)`$")?,
            explicit: Regex::new(r"(?s)^#(\S+)\s+(.+)$")?,
        })
    }

    /// Work out the IRC target and payload of a Discord message.
    ///
    /// A reply to one of the bridge's own messages goes to the nickname that
    /// message came from, with the reply's text as-is. Anything else must
    /// start with `#<nick> `.
    pub fn decode(
        &self,
        body: &str,
        reply_to: Option<&ReplyContext>,
    ) -> Result<AddressingEnvelope, DecodeError> {
        let replied_nick = reply_to
            .filter(|r| r.authored_by_bridge && !body.trim().is_empty())
            .and_then(|r| self.bridge_message.captures(&r.content))
            .map(|caps| caps[1].to_string());
        if let Some(target) = replied_nick {
            return Ok(AddressingEnvelope {
                target,
                payload: body.to_string(),
            });
        }

        let caps = self.explicit.captures(body).ok_or(DecodeError)?;
        Ok(AddressingEnvelope {
            target: caps[1].to_string(),
            payload: caps[2].to_string(),
        })
    }
}
