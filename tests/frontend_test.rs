//! End-to-end tests: real acceptors, real sockets, one frontend per test.

use std::time::Duration;

use cluster_frontend::cluster::{ServerDescriptor, StaticDiscovery, TcpForwarder};
use cluster_frontend::frontend::{BootstrapError, FrontendBuilder, ServerRole};
use cluster_frontend::net::{AcceptorConfig, AcceptorError};
use cluster_frontend::protocol::Status;
use cluster_frontend::routing::RouteDictionary;
use cluster_frontend::strategy::{FixedPick, RoundRobin};
use serde_json::{json, Value};

mod common;

use common::{TcpClient, WsClient};

fn client_dictionary() -> RouteDictionary {
    let mut dictionary = RouteDictionary::new();
    dictionary.define("connector.getsessiondata", 1).unwrap();
    dictionary.define("connector.setsessiondata", 2).unwrap();
    dictionary.define("room.join", 3).unwrap();
    dictionary
}

fn connector() -> FrontendBuilder {
    FrontendBuilder::new()
        .role(ServerRole::frontend("connector"))
        .define_route("connector.getsessiondata", 1)
        .define_route("connector.setsessiondata", 2)
        .define_route("room.join", 3)
        .connector_component()
}

#[tokio::test]
async fn sessions_are_per_connection_across_transports() {
    let frontend = connector()
        .add_acceptor(AcceptorConfig::tcp("127.0.0.1:0"))
        .add_acceptor(AcceptorConfig::websocket("127.0.0.1:0"))
        .start()
        .await
        .unwrap();
    let addrs = frontend.local_addrs().to_vec();
    let closer = frontend.closer();
    tokio::spawn(frontend.run_until(std::future::pending()));

    let dictionary = client_dictionary();
    let mut tcp = TcpClient::connect(addrs[0]).await;
    let set = tcp
        .request("connector.setsessiondata", br#"{"uid":"alice"}"#, Some(&dictionary))
        .await;
    assert_eq!(set.status, Status::Ok);

    // Compressed and uncompressed routes reach the same handler.
    for dict in [Some(&dictionary), None] {
        let get = tcp.request("connector.getsessiondata", b"", dict).await;
        assert_eq!(get.status, Status::Ok);
        let data: Value = serde_json::from_slice(&get.body).unwrap();
        assert_eq!(data, json!({ "uid": "alice" }));
    }

    let mut ws = WsClient::connect(addrs[1]).await;
    let get = ws.request("connector.getsessiondata", b"", Some(&dictionary)).await;
    assert_eq!(get.status, Status::Ok);
    let data: Value = serde_json::from_slice(&get.body).unwrap();
    assert_eq!(data, json!({}));

    closer.close();
}

#[tokio::test]
async fn remote_routes_follow_the_registered_strategy() {
    let mut servers = Vec::new();
    for id in ["room-1", "room-2", "room-3"] {
        let addr = common::start_mock_server(id).await;
        servers.push(ServerDescriptor::new(id, "room", addr.to_string()));
    }

    let frontend = connector()
        .register_strategy("room", FixedPick::new("room-2"))
        .discovery(StaticDiscovery::new(servers))
        .forwarder(TcpForwarder::new(Duration::from_secs(2), common::MAX_FRAME))
        .add_acceptor(AcceptorConfig::tcp("127.0.0.1:0"))
        .start()
        .await
        .unwrap();
    let addr = frontend.local_addrs()[0];
    let closer = frontend.closer();
    tokio::spawn(frontend.run_until(std::future::pending()));

    let dictionary = client_dictionary();
    let mut client = TcpClient::connect(addr).await;
    for _ in 0..5 {
        let response = client.request("room.join", b"{}", Some(&dictionary)).await;
        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.body, b"room-2");
    }
    closer.close();
}

#[tokio::test]
async fn round_robin_rotates_in_id_order() {
    let mut servers = Vec::new();
    for id in ["chat-b", "chat-a"] {
        let addr = common::start_mock_server(id).await;
        servers.push(ServerDescriptor::new(id, "chat", addr.to_string()));
    }

    let frontend = connector()
        .register_strategy("chat", RoundRobin::new())
        .discovery(StaticDiscovery::new(servers))
        .add_acceptor(AcceptorConfig::tcp("127.0.0.1:0"))
        .start()
        .await
        .unwrap();
    let addr = frontend.local_addrs()[0];
    let closer = frontend.closer();
    tokio::spawn(frontend.run_until(std::future::pending()));

    let mut client = TcpClient::connect(addr).await;
    let mut picks = Vec::new();
    for _ in 0..4 {
        let response = client.request("chat.send", b"hi", None).await;
        assert_eq!(response.status, Status::Ok);
        picks.push(String::from_utf8(response.body).unwrap());
    }
    assert_eq!(picks, ["chat-a", "chat-b", "chat-a", "chat-b"]);
    closer.close();
}

#[tokio::test]
async fn routing_and_protocol_errors_keep_the_connection_open() {
    let frontend = connector()
        .add_acceptor(AcceptorConfig::tcp("127.0.0.1:0"))
        .start()
        .await
        .unwrap();
    let addr = frontend.local_addrs()[0];
    let closer = frontend.closer();
    tokio::spawn(frontend.run_until(std::future::pending()));

    let mut client = TcpClient::connect(addr).await;

    // No room servers known.
    let response = client.request("room.join", b"{}", None).await;
    assert_eq!(response.status, Status::Retryable);
    assert!(String::from_utf8_lossy(&response.body).contains("room"));

    // Unknown compressed route code.
    let response = client.send_raw(&[0x01, 0x00, 0x63]).await;
    assert_eq!(response.status, Status::Error);

    // Local route without a handler.
    let response = client.request("connector.missing", b"", None).await;
    assert_eq!(response.status, Status::Error);

    let response = client.request("connector.getsessiondata", b"", None).await;
    assert_eq!(response.status, Status::Ok);
    closer.close();
}

#[tokio::test]
async fn unreachable_server_is_retryable() {
    let dead = common::free_address();
    let frontend = connector()
        .discovery(StaticDiscovery::new([ServerDescriptor::new("room-1", "room", dead)]))
        .forwarder(TcpForwarder::new(Duration::from_secs(1), common::MAX_FRAME))
        .add_acceptor(AcceptorConfig::tcp("127.0.0.1:0"))
        .start()
        .await
        .unwrap();
    let addr = frontend.local_addrs()[0];
    let closer = frontend.closer();
    tokio::spawn(frontend.run_until(std::future::pending()));

    let mut client = TcpClient::connect(addr).await;
    let response = client.request("room.join", b"", None).await;
    assert_eq!(response.status, Status::Retryable);
    closer.close();
}

#[tokio::test]
async fn duplicate_acceptor_address_leaves_nothing_bound() {
    let address = common::free_address();
    let err = connector()
        .add_acceptor(AcceptorConfig::websocket(&address))
        .add_acceptor(AcceptorConfig::tcp(&address))
        .start()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Acceptor(AcceptorError::AddressConflict { address: ref conflict }) if *conflict == address
    ));

    std::net::TcpListener::bind(&address).expect("no listener may remain bound");
}

#[tokio::test]
async fn closing_acceptors_spares_open_connections() {
    let frontend = connector()
        .add_acceptor(AcceptorConfig::tcp("127.0.0.1:0"))
        .start()
        .await
        .unwrap();
    let addr = frontend.local_addrs()[0];
    let closer = frontend.closer();
    let run = tokio::spawn(frontend.run_until(std::future::pending()));

    let mut client = TcpClient::connect(addr).await;
    assert_eq!(client.request("connector.getsessiondata", b"", None).await.status, Status::Ok);

    closer.close();
    tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("run should return once closed")
        .unwrap();

    // The accepted connection is still served.
    assert_eq!(client.request("connector.getsessiondata", b"", None).await.status, Status::Ok);

    // New connections are refused.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
