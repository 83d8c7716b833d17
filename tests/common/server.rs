//! Scripted IRC server.
//!
//! Accepts one client at a time and lets the test drive the conversation
//! line by line.

use ith::irc::{Command, Message};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

/// A listening fake server on an ephemeral localhost port.
pub struct FakeIrcServer {
    listener: TcpListener,
    port: u16,
}

impl FakeIrcServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` as accepted by `--address`.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Wait for the client to connect.
    pub async fn accept(&self) -> anyhow::Result<ServerConnection> {
        let (stream, _) = timeout(Duration::from_secs(10), self.listener.accept()).await??;
        Ok(ServerConnection::new(stream))
    }
}

/// The server side of one client connection.
pub struct ServerConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl ServerConnection {
    fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        }
    }

    /// Send a raw line; CRLF is appended.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single line from the client, without its line ending.
    pub async fn recv_line(&mut self) -> anyhow::Result<String> {
        self.recv_line_timeout(Duration::from_secs(5)).await
    }

    pub async fn recv_line_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("client closed the connection");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Receive lines until one starts with `prefix`, returning that line.
    pub async fn recv_until(&mut self, prefix: &str) -> anyhow::Result<String> {
        loop {
            let line = self.recv_line().await?;
            if line.starts_with(prefix) {
                return Ok(line);
            }
        }
    }

    /// Receive lines until one starts with `prefix`, returning its command.
    #[allow(dead_code)]
    pub async fn recv_command_until(&mut self, prefix: &str) -> anyhow::Result<Command> {
        let line = self.recv_until(prefix).await?;
        Ok(parse_line(&line)?.command)
    }

    /// Read the registration burst and answer with RPL_WELCOME.
    ///
    /// Returns the lines the client sent.
    pub async fn complete_registration(&mut self, nick: &str) -> anyhow::Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.recv_line().await?;
            let done = line.starts_with("USER ");
            lines.push(line);
            if done {
                break;
            }
        }
        self.send_raw(&format!(":test.server 001 {} :Welcome to the test network", nick))
            .await?;
        Ok(lines)
    }

    /// Whether the client has closed its end, waiting up to `dur`.
    #[allow(dead_code)]
    pub async fn is_closed_within(&mut self, dur: Duration) -> bool {
        let mut line = String::new();
        loop {
            line.clear();
            match timeout(dur, self.reader.read_line(&mut line)).await {
                Ok(Ok(0)) | Ok(Err(_)) => return true,
                Ok(Ok(_)) => continue,
                Err(_) => return false,
            }
        }
    }
}

/// Parse one line as the client sent it.
pub fn parse_line(line: &str) -> anyhow::Result<Message> {
    Ok(format!("{line}\r\n").parse::<Message>()?)
}
