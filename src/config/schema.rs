//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the frontend.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::ServerDescriptor;
use crate::net::ListenerOptions;
use crate::protocol::DEFAULT_MAX_FRAME_BYTES;
use crate::routing::DictionaryEntry;
use crate::strategy::StrategyKind;

/// Root configuration for one frontend node.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Base port. Derived acceptors use `port`, `port + 1` and `port + 2`.
    pub listen_port: u16,

    /// This node's role in the cluster, e.g. "connector".
    pub server_type: String,

    /// Whether this node accepts client connections.
    pub frontend: bool,

    /// Maximum concurrent connections per acceptor (backpressure).
    pub max_connections: usize,

    /// Upper bound for TLS handshake plus websocket upgrade.
    pub handshake_timeout_secs: u64,

    /// Largest frame accepted from clients and peers.
    pub max_frame_bytes: usize,

    /// Timeout for one forwarded request.
    pub forward_timeout_secs: u64,

    /// Optional TLS material; enables the encrypted acceptor.
    pub tls: Option<TlsConfig>,

    /// Ordered route dictionary, sealed at startup.
    pub dictionary: Vec<DictionaryEntry>,

    /// Service name → strategy selector.
    pub strategies: BTreeMap<String, StrategyKind>,

    /// Static cluster membership.
    pub servers: Vec<ServerDescriptor>,

    /// Explicit acceptors. When empty, acceptors are derived from `listen_port`.
    pub acceptors: Vec<AcceptorConfig>,

    /// Free-form metadata announced with the cluster role.
    pub metadata: BTreeMap<String, String>,

    pub observability: ObservabilityConfig,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            listen_port: 3350,
            server_type: "connector".to_string(),
            frontend: true,
            max_connections: 10_000,
            handshake_timeout_secs: 5,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            forward_timeout_secs: 5,
            tls: None,
            dictionary: Vec::new(),
            strategies: BTreeMap::new(),
            servers: Vec::new(),
            acceptors: Vec::new(),
            metadata: BTreeMap::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl FrontendConfig {
    /// Acceptors this node will bind.
    ///
    /// Derived layout: websocket on `listen_port`, tcp on `listen_port + 1`,
    /// tcp+tls on `listen_port + 2` when TLS is configured. Backends bind nothing.
    pub fn effective_acceptors(&self) -> Vec<AcceptorConfig> {
        if !self.frontend {
            return Vec::new();
        }
        if !self.acceptors.is_empty() {
            return self.acceptors.clone();
        }

        let port = self.listen_port;
        let mut acceptors = vec![
            AcceptorConfig::websocket(format!("0.0.0.0:{}", port)),
            AcceptorConfig::tcp(format!("0.0.0.0:{}", port.saturating_add(1))),
        ];
        if let Some(tls) = &self.tls {
            acceptors.push(
                AcceptorConfig::tcp(format!("0.0.0.0:{}", port.saturating_add(2)))
                    .with_tls(&tls.cert_path, &tls.key_path),
            );
        }
        acceptors
    }

    pub fn listener_options(&self) -> ListenerOptions {
        ListenerOptions {
            max_connections: self.max_connections,
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
            max_frame_bytes: self.max_frame_bytes,
        }
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_secs(self.forward_timeout_secs)
    }
}

/// Transport framing of an acceptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Raw stream with length-prefixed frames.
    #[default]
    Tcp,
    /// Websocket messages.
    Websocket,
}

/// TLS configuration for an acceptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// One listener specification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AcceptorConfig {
    /// Bind address (e.g., "0.0.0.0:3350").
    pub address: String,

    #[serde(default)]
    pub transport: TransportKind,

    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl AcceptorConfig {
    pub fn tcp(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            transport: TransportKind::Tcp,
            tls: None,
        }
    }

    pub fn websocket(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            transport: TransportKind::Websocket,
            tls: None,
        }
    }

    pub fn with_tls(mut self, cert_path: impl Into<String>, key_path: impl Into<String>) -> Self {
        self.tls = Some(TlsConfig {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        });
        self
    }

    /// Short transport label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match (self.transport, self.tls.is_some()) {
            (TransportKind::Tcp, false) => "tcp",
            (TransportKind::Tcp, true) => "tls",
            (TransportKind::Websocket, false) => "ws",
            (TransportKind::Websocket, true) => "wss",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
