//! Encrypted acceptor: real handshakes, broken handshakes, and their isolation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cluster_frontend::frontend::{FrontendBuilder, ServerRole};
use cluster_frontend::net::{AcceptorCloser, AcceptorConfig, ListenerOptions};
use cluster_frontend::protocol::{self, Response, Status};
use cluster_frontend::routing::Route;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

mod common;

use common::TcpClient;

struct Fixture {
    plain: std::net::SocketAddr,
    secure: std::net::SocketAddr,
    cert: CertificateDer<'static>,
    closer: AcceptorCloser,
    files: Vec<PathBuf>,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.closer.close();
        for file in &self.files {
            let _ = std::fs::remove_file(file);
        }
    }
}

async fn start(name: &str) -> Fixture {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();

    let dir = std::env::temp_dir();
    let cert_path = dir.join(format!("cluster-frontend-{name}-{}-cert.pem", std::process::id()));
    let key_path = dir.join(format!("cluster-frontend-{name}-{}-key.pem", std::process::id()));
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();

    let options = ListenerOptions {
        handshake_timeout: Duration::from_millis(300),
        ..ListenerOptions::default()
    };
    let frontend = FrontendBuilder::new()
        .role(ServerRole::frontend("connector"))
        .connector_component()
        .listener_options(options)
        .add_acceptor(AcceptorConfig::tcp("127.0.0.1:0"))
        .add_acceptor(
            AcceptorConfig::tcp("127.0.0.1:0")
                .with_tls(cert_path.to_string_lossy(), key_path.to_string_lossy()),
        )
        .start()
        .await
        .unwrap();

    let addrs = frontend.local_addrs().to_vec();
    let closer = frontend.closer();
    tokio::spawn(frontend.run_until(std::future::pending()));

    Fixture {
        plain: addrs[0],
        secure: addrs[1],
        cert: cert.der().clone(),
        closer,
        files: vec![cert_path, key_path],
    }
}

/// Read until the server hangs up; fails the test if it never does.
async fn expect_hangup(mut stream: TcpStream) {
    let mut buf = [0u8; 1024];
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => continue,
            }
        }
    })
    .await
    .expect("server should drop the connection");
}

/// Complete a TLS handshake on the secure listener and send one request.
async fn tls_request(fixture: &Fixture, route: &str) -> Response {
    let mut roots = RootCertStore::empty();
    roots.add(fixture.cert.clone()).unwrap();
    let provider = Arc::new(tokio_rustls::rustls::crypto::aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let stream = TcpStream::connect(fixture.secure).await.unwrap();
    let mut tls = tokio::time::timeout(
        Duration::from_secs(3),
        connector.connect(ServerName::try_from("localhost").unwrap(), stream),
    )
    .await
    .expect("tls handshake should complete")
    .unwrap();

    let route = Route::parse(route).unwrap();
    protocol::write_frame(&mut tls, &protocol::encode_request(&route, b"", None))
        .await
        .unwrap();
    let frame = protocol::read_frame(&mut tls, common::MAX_FRAME).await.unwrap().unwrap();
    Response::decode(&frame).unwrap()
}

#[tokio::test]
async fn tls_client_is_served() {
    let fixture = start("served").await;

    let response = tls_request(&fixture, "connector.getsessiondata").await;
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.body, b"{}");
}

#[tokio::test]
async fn failed_handshakes_drop_only_that_connection() {
    let fixture = start("garbage").await;

    // A plain client already connected before the bad handshakes.
    let mut plain = TcpClient::connect(fixture.plain).await;

    // Not a TLS ClientHello.
    let mut garbage = TcpStream::connect(fixture.secure).await.unwrap();
    garbage.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    expect_hangup(garbage).await;

    // Silent client: dropped by the handshake timeout.
    let silent = TcpStream::connect(fixture.secure).await.unwrap();
    expect_hangup(silent).await;

    // The encrypted listener still serves, and other connections are untouched.
    let response = tls_request(&fixture, "connector.getsessiondata").await;
    assert_eq!(response.status, Status::Ok);

    let response = plain.request("connector.getsessiondata", b"", None).await;
    assert_eq!(response.status, Status::Ok);
}
