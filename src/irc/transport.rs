//! Framed IRC transport over TCP or client-side TLS.
//!
//! Lines are split on `\n` and written with `\r\n`. Invalid UTF-8 is decoded
//! lossily, since IRC networks still carry legacy encodings.

use super::Message;
use crate::error::{ConnectionError, IrcError};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_util::codec::{AnyDelimiterCodec, Framed};
use tracing::{debug, info, warn};

/// Maximum IRC line length (8191 bytes as per modern IRC conventions).
pub const MAX_IRC_LINE_LEN: usize = 8191;

fn line_codec() -> AnyDelimiterCodec {
    AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\r\n".to_vec(), MAX_IRC_LINE_LEN)
}

/// Byte stream the transport can run over.
pub trait IrcStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> IrcStream for T {}

/// IRC transport: a framed byte stream yielding parsed [`Message`]s.
pub struct Transport {
    framed: Framed<Box<dyn IrcStream>, AnyDelimiterCodec>,
}

impl Transport {
    /// Wrap an already-connected stream.
    pub fn new<S: IrcStream + 'static>(stream: S) -> Self {
        Self {
            framed: Framed::new(Box::new(stream), line_codec()),
        }
    }

    /// Open a TCP connection (and TLS session, if requested) to `address:port`.
    ///
    /// Both the TCP connect and the TLS handshake are bounded by `limit`.
    pub async fn connect(
        address: &str,
        port: u16,
        tls: bool,
        limit: Duration,
    ) -> Result<Self, ConnectionError> {
        let tcp = timeout(limit, TcpStream::connect((address, port)))
            .await
            .map_err(|_| ConnectionError::Timeout {
                address: address.to_string(),
                port,
                timeout: limit,
            })?
            .map_err(|source| ConnectionError::Io {
                address: address.to_string(),
                port,
                source,
            })?;

        if let Err(e) = tcp.set_nodelay(true) {
            debug!(error = %e, "failed to set TCP_NODELAY");
        }

        if !tls {
            info!(address = %address, port, "Connecting without TLS");
            return Ok(Self::new(tcp));
        }

        info!(address = %address, port, "Using TLS for connection");
        let stream = timeout(limit, upgrade_to_tls(tcp, address))
            .await
            .map_err(|_| ConnectionError::Timeout {
                address: address.to_string(),
                port,
                timeout: limit,
            })??;
        Ok(Self::new(stream))
    }

    /// Read the next message.
    ///
    /// Returns `Ok(None)` when the server closed the connection. Lines that do
    /// not parse are logged and skipped. Cancel-safe.
    pub async fn read_message(&mut self) -> Result<Option<Message>, IrcError> {
        loop {
            let Some(line) = self.framed.next().await else {
                return Ok(None);
            };
            let chunk = line?;
            let text = String::from_utf8_lossy(&chunk);
            let line = text.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            // The parser expects a terminated line.
            match format!("{line}\r\n").parse::<Message>() {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => warn!(line = %line, error = %e, "Skipping unparseable line"),
            }
        }
    }

    /// Write a message and flush it.
    ///
    /// Parameters carrying a line break or NUL would smuggle a second command
    /// onto the wire; such messages are rejected before anything is written.
    pub async fn write_message(&mut self, msg: &Message) -> Result<(), IrcError> {
        let rendered = msg.to_string();
        let line = rendered.trim_end_matches(['\r', '\n']);
        if line.contains(['\r', '\n', '\0']) {
            return Err(IrcError::InvalidMessage(line.to_string()));
        }
        self.framed.send(line).await?;
        Ok(())
    }

    /// Flush and shut down the write half.
    pub async fn close(&mut self) -> Result<(), IrcError> {
        SinkExt::<String>::close(&mut self.framed).await?;
        Ok(())
    }
}

/// Upgrades a TCP stream to TLS, verifying against the system root store.
async fn upgrade_to_tls(
    tcp: TcpStream,
    hostname: &str,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>, ConnectionError> {
    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            warn!("Failed to add root cert: {}", e);
        }
    }
    for e in &certs.errors {
        warn!("Error loading native certs: {}", e);
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| ConnectionError::InvalidServerName(hostname.to_string()))?;

    let stream = connector
        .connect(server_name, tcp)
        .await
        .map_err(|source| ConnectionError::Tls {
            address: hostname.to_string(),
            source,
        })?;

    info!(hostname = %hostname, "TLS handshake completed");
    Ok(stream)
}
