//! Per-connection session context.
//!
//! The router treats a session as opaque: strategies receive it by shared
//! reference and pass it through. Only local handlers mutate it.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde_json::Value;

use crate::net::connection::ConnectionId;

/// State carried for the lifetime of one client connection.
#[derive(Debug, Clone)]
pub struct Session {
    id: ConnectionId,
    peer_addr: SocketAddr,
    data: BTreeMap<String, Value>,
}

impl Session {
    pub fn new(id: ConnectionId, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            data: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// Merge every key of `values` into the session, overwriting existing keys.
    pub fn merge(&mut self, values: serde_json::Map<String, Value>) {
        self.data.extend(values);
    }
}
