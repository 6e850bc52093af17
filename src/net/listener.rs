//! TCP listener implementation with backpressure and transport handshakes.
//!
//! # Responsibilities
//! - Bind to the configured address, loading TLS material first
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Run TLS / websocket handshakes, yielding connections in accept order
//! - Graceful handling of accept and handshake errors

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesOrdered, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::config::{AcceptorConfig, TransportKind};
use crate::net::acceptor::{wait_closed, AcceptorError};
use crate::net::connection::{BoxedIo, Connection};
use crate::net::tls::load_tls_acceptor;
use crate::observability::metrics;
use crate::protocol::DEFAULT_MAX_FRAME_BYTES;

/// Pause after an accept error (e.g. file descriptor exhaustion) before retrying.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Limits shared by every listener of an acceptor set.
#[derive(Debug, Clone)]
pub struct ListenerOptions {
    /// Maximum concurrent connections per listener.
    pub max_connections: usize,
    /// Upper bound for a TLS handshake plus websocket upgrade.
    pub handshake_timeout: Duration,
    /// Largest frame a connection will accept.
    pub max_frame_bytes: usize,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            handshake_timeout: Duration::from_secs(5),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Error for a single connection's handshake. Never affects the listener.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("tls handshake failed: {0}")]
    Tls(#[source] io::Error),

    #[error("websocket upgrade failed: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),
}

type PendingHandshake = BoxFuture<'static, (SocketAddr, Result<Connection, HandshakeError>)>;

/// A bound acceptor.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
pub struct Listener {
    inner: TcpListener,
    config: AcceptorConfig,
    local_addr: SocketAddr,
    tls: Option<TlsAcceptor>,
    connection_limit: Arc<Semaphore>,
    options: ListenerOptions,
}

impl Listener {
    /// Bind to the configured address. TLS material is loaded before the socket is bound.
    pub async fn bind(config: &AcceptorConfig, options: &ListenerOptions) -> Result<Self, AcceptorError> {
        let addr: SocketAddr = config
            .address
            .parse()
            .map_err(|e: std::net::AddrParseError| AcceptorError::InvalidAddress {
                address: config.address.clone(),
                reason: e.to_string(),
            })?;

        let tls = match &config.tls {
            Some(tls) => Some(
                load_tls_acceptor(Path::new(&tls.cert_path), Path::new(&tls.key_path))
                    .await
                    .map_err(|source| AcceptorError::Tls {
                        address: config.address.clone(),
                        source,
                    })?,
            ),
            None => None,
        };

        let inner = TcpListener::bind(addr)
            .await
            .map_err(|source| AcceptorError::Bind {
                address: config.address.clone(),
                source,
            })?;

        let local_addr = inner.local_addr().map_err(|source| AcceptorError::Bind {
            address: config.address.clone(),
            source,
        })?;

        tracing::info!(
            address = %local_addr,
            transport = config.label(),
            max_connections = options.max_connections,
            "Acceptor bound"
        );

        Ok(Self {
            inner,
            config: config.clone(),
            local_addr,
            tls,
            connection_limit: Arc::new(Semaphore::new(options.max_connections)),
            options: options.clone(),
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &AcceptorConfig {
        &self.config
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Accept a raw TCP connection, respecting the connection limit.
    ///
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr, OwnedSemaphorePermit)> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| io::Error::other("connection limit semaphore closed"))?;

        let (stream, addr) = self.inner.accept().await?;
        let _ = stream.set_nodelay(true);

        tracing::trace!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, permit))
    }

    /// Build the handshake future for one accepted stream.
    fn handshake(
        &self,
        stream: TcpStream,
        peer_addr: SocketAddr,
        permit: OwnedSemaphorePermit,
    ) -> impl Future<Output = (SocketAddr, Result<Connection, HandshakeError>)> + Send + 'static {
        let tls = self.tls.clone();
        let kind = self.config.transport;
        let local_addr = self.local_addr;
        let timeout = self.options.handshake_timeout;
        let max_frame_bytes = self.options.max_frame_bytes;

        async move {
            let upgrade = async move {
                let secure = tls.is_some();
                let io: BoxedIo = match tls {
                    Some(acceptor) => Box::new(acceptor.accept(stream).await.map_err(HandshakeError::Tls)?),
                    None => Box::new(stream),
                };

                let connection = match kind {
                    TransportKind::Tcp => {
                        Connection::stream(io, peer_addr, local_addr, secure, max_frame_bytes)
                    }
                    TransportKind::Websocket => {
                        // Oversized messages are refused while reading, not after buffering.
                        let limits = WebSocketConfig::default()
                            .max_message_size(Some(max_frame_bytes))
                            .max_frame_size(Some(max_frame_bytes));
                        let ws = tokio_tungstenite::accept_async_with_config(io, Some(limits)).await?;
                        Connection::websocket(ws, peer_addr, local_addr, secure, max_frame_bytes)
                    }
                };
                Ok::<_, HandshakeError>(connection)
            };

            let result = match tokio::time::timeout(timeout, upgrade).await {
                Ok(result) => result.map(|connection| connection.with_permit(permit)),
                Err(_) => Err(HandshakeError::Timeout(timeout)),
            };
            (peer_addr, result)
        }
    }

    /// Accept until `closed` flips to true or the consumer goes away.
    pub(crate) async fn run(self, tx: mpsc::Sender<Connection>, mut closed: watch::Receiver<bool>) {
        let label = self.config.label();
        let mut pending: FuturesOrdered<PendingHandshake> = FuturesOrdered::new();

        loop {
            tokio::select! {
                biased;

                _ = wait_closed(&mut closed) => break,

                Some((peer_addr, result)) = pending.next(), if !pending.is_empty() => match result {
                    Ok(connection) => {
                        metrics::record_connection_accepted(label);
                        tracing::debug!(
                            connection_id = %connection.id(),
                            peer_addr = %peer_addr,
                            transport = label,
                            "Connection established"
                        );
                        tokio::select! {
                            biased;
                            _ = wait_closed(&mut closed) => break,
                            sent = tx.send(connection) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Err(error) => {
                        metrics::record_handshake_failure(label);
                        tracing::warn!(peer_addr = %peer_addr, transport = label, error = %error, "Handshake failed");
                    }
                },

                accepted = self.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        pending.push_back(Box::pin(self.handshake(stream, peer_addr, permit)));
                    }
                    Err(error) => {
                        tracing::error!(address = %self.local_addr, error = %error, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        tracing::info!(address = %self.local_addr, transport = label, "Acceptor stopped");
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("local_addr", &self.local_addr)
            .field("transport", &self.config.label())
            .field("max_connections", &self.options.max_connections)
            .finish()
    }
}
