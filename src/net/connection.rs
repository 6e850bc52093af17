//! Uniform connection abstraction over every transport.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Hide the transport (tcp, tls, websocket) behind frame-level recv/send
//! - Hold the listener's connection slot for the connection's lifetime

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::OwnedSemaphorePermit;
use tokio_tungstenite::tungstenite::error::CapacityError;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use crate::config::TransportKind;
use crate::protocol::{read_frame, write_frame, FrameError};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Byte stream after the optional TLS layer.
pub(crate) trait AsyncIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncIo for T {}

pub(crate) type BoxedIo = Box<dyn AsyncIo>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

enum Transport {
    /// Length-prefixed frames over tcp or tls.
    Stream(BoxedIo),
    /// One frame per websocket message.
    WebSocket(Box<WebSocketStream<BoxedIo>>),
}

/// An accepted client connection, independent of its transport.
pub struct Connection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    kind: TransportKind,
    secure: bool,
    max_frame_bytes: usize,
    transport: Transport,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Connection {
    pub(crate) fn stream(
        io: BoxedIo,
        peer_addr: SocketAddr,
        local_addr: SocketAddr,
        secure: bool,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_addr,
            local_addr,
            kind: TransportKind::Tcp,
            secure,
            max_frame_bytes,
            transport: Transport::Stream(io),
            _permit: None,
        }
    }

    pub(crate) fn websocket(
        ws: WebSocketStream<BoxedIo>,
        peer_addr: SocketAddr,
        local_addr: SocketAddr,
        secure: bool,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_addr,
            local_addr,
            kind: TransportKind::Websocket,
            secure,
            max_frame_bytes,
            transport: Transport::WebSocket(Box::new(ws)),
            _permit: None,
        }
    }

    pub(crate) fn with_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self._permit = Some(permit);
        self
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Whether the transport is TLS-encrypted.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Receive the next frame. `Ok(None)` means the peer closed the connection.
    pub async fn recv(&mut self) -> Result<Option<Vec<u8>>, ConnectionError> {
        let max = self.max_frame_bytes;
        match &mut self.transport {
            Transport::Stream(io) => Ok(read_frame(io, max).await?),
            Transport::WebSocket(ws) => loop {
                let data = match ws.next().await {
                    None => return Ok(None),
                    Some(Err(tungstenite::Error::ConnectionClosed)) => return Ok(None),
                    Some(Err(tungstenite::Error::Capacity(CapacityError::MessageTooLong { size, .. }))) => {
                        return Err(FrameError::TooLarge { len: size, max }.into());
                    }
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Message::Binary(data))) => data.to_vec(),
                    Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                    Some(Ok(Message::Close(_))) => return Ok(None),
                    // Pongs are queued by tungstenite and flushed on the next write.
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                };
                if data.len() > max {
                    return Err(FrameError::TooLarge {
                        len: data.len(),
                        max,
                    }
                    .into());
                }
                return Ok(Some(data));
            },
        }
    }

    /// Send one frame.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), ConnectionError> {
        match &mut self.transport {
            Transport::Stream(io) => write_frame(io, data).await?,
            Transport::WebSocket(ws) => ws.send(Message::binary(data.to_vec())).await?,
        }
        Ok(())
    }

    /// Close the connection, best effort.
    pub async fn close(mut self) {
        let result = match &mut self.transport {
            Transport::Stream(io) => io.shutdown().await.map_err(|e| e.to_string()),
            Transport::WebSocket(ws) => WebSocketStream::close(ws.as_mut(), None)
                .await
                .map_err(|e| e.to_string()),
        };
        if let Err(error) = result {
            tracing::trace!(connection_id = %self.id, error = %error, "Error while closing connection");
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("local_addr", &self.local_addr)
            .field("kind", &self.kind)
            .field("secure", &self.secure)
            .finish()
    }
}
