//! IRC client layer.
//!
//! Message parsing and serialization come from `irc-proto`; framing is
//! tokio-util's delimiter codec. What lives here is the transport (TCP or
//! TLS), registration, and an [`IrcSession`] that classifies inbound traffic
//! into [`IrcEvent`]s for the supervisor.

mod session;
mod transport;

pub use irc_proto::{Command, Message, Prefix, Response};
pub use session::{IrcEvent, IrcSession, split_outbound};
pub use transport::{IrcStream, MAX_IRC_LINE_LEN, Transport};
