//! Handle through which hooks submit commands to the IRC session.

use crate::error::IrcError;
use tokio::sync::{mpsc, oneshot};

/// Result of executing a submitted command.
pub type Ack = Result<(), IrcError>;

/// Commands hooks may ask the supervisor to execute.
#[derive(Debug)]
pub enum IrcCommand {
    /// Send `text` to `target`; the outcome is reported on `ack` if present.
    PrivMsg {
        target: String,
        text: String,
        ack: Option<oneshot::Sender<Ack>>,
    },
    Quit { reason: Option<String> },
}

/// Cloneable sender side of the supervisor's command queue.
///
/// Submission never blocks: a full queue is reported as
/// [`IrcError::QueueFull`] and a stopped supervisor as
/// [`IrcError::SessionClosed`].
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    nickname: String,
    commands: mpsc::Sender<IrcCommand>,
}

impl SupervisorHandle {
    /// Create a handle and the receiver the supervisor drains.
    pub fn channel(
        nickname: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<IrcCommand>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                nickname: nickname.into(),
                commands: tx,
            },
            rx,
        )
    }

    /// Nickname the session registers with.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn submit(&self, command: IrcCommand) -> Result<(), IrcError> {
        self.commands.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => IrcError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => IrcError::SessionClosed,
        })
    }

    /// Queue a PRIVMSG and return the receiver for its acknowledgment.
    pub fn send_privmsg(
        &self,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<oneshot::Receiver<Ack>, IrcError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.submit(IrcCommand::PrivMsg {
            target: target.into(),
            text: text.into(),
            ack: Some(ack_tx),
        })?;
        Ok(ack_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_privmsg_queues_command() {
        let (handle, mut rx) = SupervisorHandle::channel("ith", 4);
        let ack = handle.send_privmsg("alice", "hello").unwrap();

        let Some(IrcCommand::PrivMsg { target, text, ack: Some(tx) }) = rx.recv().await else {
            panic!("expected PrivMsg with ack");
        };
        assert_eq!(target, "alice");
        assert_eq!(text, "hello");

        tx.send(Ok(())).unwrap();
        assert!(ack.await.unwrap().is_ok());
    }

    #[test]
    fn test_full_queue() {
        let (handle, _rx) = SupervisorHandle::channel("ith", 1);
        handle.send_privmsg("a", "1").unwrap();
        assert!(matches!(
            handle.send_privmsg("a", "2"),
            Err(IrcError::QueueFull)
        ));
    }

    #[test]
    fn test_closed_queue() {
        let (handle, rx) = SupervisorHandle::channel("ith", 1);
        drop(rx);
        assert!(matches!(
            handle.send_privmsg("a", "1"),
            Err(IrcError::SessionClosed)
        ));
    }
}
