//! Delivery of routed requests to the selected cluster member.

use std::io;
use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::net::TcpStream;

use crate::cluster::server::ServerDescriptor;
use crate::protocol::{self, FrameError, ProtocolError, Response, Status};
use crate::routing::Route;
use crate::session::Session;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("request to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    #[error("server {server_id} closed the connection without replying")]
    Closed { server_id: String },

    #[error("server {server_id} rejected the request: {message}")]
    Remote {
        server_id: String,
        retryable: bool,
        message: String,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ForwardError {
    /// Whether the client may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            ForwardError::Remote { retryable, .. } => *retryable,
            ForwardError::Connect { .. }
            | ForwardError::Timeout { .. }
            | ForwardError::Closed { .. } => true,
            ForwardError::Frame(_) | ForwardError::Protocol(_) => false,
        }
    }
}

/// Cluster transport used to hand a request to a remote server.
pub trait Forwarder: Send + Sync + std::fmt::Debug {
    fn forward<'a>(
        &'a self,
        server: &'a ServerDescriptor,
        session: &'a Session,
        route: &'a Route,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>, ForwardError>>;
}

/// Forwards each request over a fresh TCP connection using the client framing.
#[derive(Debug, Clone)]
pub struct TcpForwarder {
    timeout: Duration,
    max_frame_bytes: usize,
}

impl TcpForwarder {
    pub fn new(timeout: Duration, max_frame_bytes: usize) -> Self {
        Self {
            timeout,
            max_frame_bytes,
        }
    }

    async fn exchange(
        &self,
        server: &ServerDescriptor,
        route: &Route,
        payload: &[u8],
    ) -> Result<Vec<u8>, ForwardError> {
        let mut stream =
            TcpStream::connect(&server.address)
                .await
                .map_err(|source| ForwardError::Connect {
                    address: server.address.clone(),
                    source,
                })?;

        // Peers do not share our dictionary, so routes travel uncompressed.
        let request = protocol::encode_request(route, payload, None);
        protocol::write_frame(&mut stream, &request).await?;

        let frame = protocol::read_frame(&mut stream, self.max_frame_bytes)
            .await?
            .ok_or_else(|| ForwardError::Closed {
                server_id: server.id.clone(),
            })?;

        let response = Response::decode(&frame)?;
        match response.status {
            Status::Ok => Ok(response.body),
            status => Err(ForwardError::Remote {
                server_id: server.id.clone(),
                retryable: status == Status::Retryable,
                message: String::from_utf8_lossy(&response.body).into_owned(),
            }),
        }
    }
}

impl Forwarder for TcpForwarder {
    fn forward<'a>(
        &'a self,
        server: &'a ServerDescriptor,
        _session: &'a Session,
        route: &'a Route,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>, ForwardError>> {
        Box::pin(async move {
            tracing::trace!(server_id = %server.id, address = %server.address, route = %route, "Forwarding request");
            match tokio::time::timeout(self.timeout, self.exchange(server, route, payload)).await {
                Ok(result) => result,
                Err(_) => Err(ForwardError::Timeout {
                    address: server.address.clone(),
                    timeout: self.timeout,
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::ConnectionId;
    use crate::routing::RouteDictionary;
    use tokio::net::TcpListener;

    async fn spawn_backend(reply: Response) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let frame = protocol::read_frame(&mut socket, 1024).await.unwrap().unwrap();
            let request = protocol::decode_request(&frame, &RouteDictionary::new()).unwrap();
            assert_eq!(request.route.to_string(), "room.join");
            protocol::write_frame(&mut socket, &reply.encode()).await.unwrap();
        });
        addr
    }

    fn session() -> Session {
        Session::new(ConnectionId::new(), "127.0.0.1:1".parse().unwrap())
    }

    #[tokio::test]
    async fn returns_backend_body() {
        let address = spawn_backend(Response::ok(b"joined".to_vec())).await;
        let server = ServerDescriptor::new("room-1", "room", address);
        let forwarder = TcpForwarder::new(Duration::from_secs(2), 1024);
        let route = Route::parse("room.join").unwrap();

        let body = forwarder
            .forward(&server, &session(), &route, b"{}")
            .await
            .unwrap();
        assert_eq!(body, b"joined");
    }

    #[tokio::test]
    async fn maps_remote_errors() {
        let address = spawn_backend(Response::retryable("busy")).await;
        let server = ServerDescriptor::new("room-1", "room", address);
        let forwarder = TcpForwarder::new(Duration::from_secs(2), 1024);
        let route = Route::parse("room.join").unwrap();

        let err = forwarder
            .forward(&server, &session(), &route, b"{}")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, ForwardError::Remote { ref message, .. } if message == "busy"));
    }

    #[tokio::test]
    async fn connect_failure_is_retryable() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let server = ServerDescriptor::new("room-1", "room", address);
        let forwarder = TcpForwarder::new(Duration::from_secs(2), 1024);
        let route = Route::parse("room.join").unwrap();

        let err = forwarder
            .forward(&server, &session(), &route, b"")
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::Connect { .. }));
        assert!(err.is_retryable());
    }
}
