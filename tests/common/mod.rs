//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use cluster_frontend::protocol::{self, Response};
use cluster_frontend::routing::{Route, RouteDictionary};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

pub const MAX_FRAME: usize = 64 * 1024;

/// Start a cluster member that answers every request with its own server id.
pub async fn start_mock_server(server_id: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let dictionary = RouteDictionary::new();
                while let Ok(Some(frame)) = protocol::read_frame(&mut socket, MAX_FRAME).await {
                    let reply = match protocol::decode_request(&frame, &dictionary) {
                        Ok(_) => Response::ok(server_id.as_bytes().to_vec()),
                        Err(e) => Response::error(e),
                    };
                    if protocol::write_frame(&mut socket, &reply.encode()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    addr
}

/// Reserve a free local port and release it again.
pub fn free_address() -> String {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap().to_string()
}

/// Client speaking length-prefixed frames over plain tcp.
pub struct TcpClient {
    stream: TcpStream,
}

impl TcpClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
        }
    }

    pub async fn send_raw(&mut self, frame: &[u8]) -> Response {
        protocol::write_frame(&mut self.stream, frame).await.unwrap();
        let reply = protocol::read_frame(&mut self.stream, MAX_FRAME)
            .await
            .unwrap()
            .expect("server closed the connection");
        Response::decode(&reply).unwrap()
    }

    pub async fn request(&mut self, route: &str, payload: &[u8], dictionary: Option<&RouteDictionary>) -> Response {
        let route = Route::parse(route).unwrap();
        self.send_raw(&protocol::encode_request(&route, payload, dictionary)).await
    }
}

/// Client sending one binary websocket message per request.
pub struct WsClient {
    ws: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}")).await.unwrap();
        Self { ws }
    }

    pub async fn request(&mut self, route: &str, payload: &[u8], dictionary: Option<&RouteDictionary>) -> Response {
        let route = Route::parse(route).unwrap();
        let frame = protocol::encode_request(&route, payload, dictionary);
        self.ws.send(Message::binary(frame)).await.unwrap();

        loop {
            match self.ws.next().await.expect("server closed the websocket").unwrap() {
                Message::Binary(data) => return Response::decode(&data).unwrap(),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("unexpected websocket message: {other:?}"),
            }
        }
    }
}
