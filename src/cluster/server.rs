//! Cluster member descriptors and per-request candidate pools.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One cluster member.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerDescriptor {
    /// Unique server id.
    pub id: String,

    /// Role of the server, e.g. "connector" or "room".
    pub server_type: String,

    /// Address the cluster transport uses to reach it.
    pub address: String,

    /// Whether the server accepts client connections.
    #[serde(default)]
    pub frontend: bool,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ServerDescriptor {
    pub fn new(
        id: impl Into<String>,
        server_type: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            server_type: server_type.into(),
            address: address.into(),
            frontend: false,
            metadata: BTreeMap::new(),
        }
    }
}

/// Live servers of one type, keyed and ordered by server id.
///
/// Built fresh for every routing decision and never shared between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePool {
    servers: BTreeMap<String, ServerDescriptor>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, server: ServerDescriptor) {
        self.servers.insert(server.id.clone(), server);
    }

    pub fn get(&self, id: &str) -> Option<&ServerDescriptor> {
        self.servers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.servers.contains_key(id)
    }

    /// The server with the lowest id.
    pub fn first(&self) -> Option<&ServerDescriptor> {
        self.servers.values().next()
    }

    /// The `index`-th server in id order.
    pub fn nth(&self, index: usize) -> Option<&ServerDescriptor> {
        self.servers.values().nth(index)
    }

    /// Servers in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &ServerDescriptor> {
        self.servers.values()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl FromIterator<ServerDescriptor> for CandidatePool {
    fn from_iter<I: IntoIterator<Item = ServerDescriptor>>(iter: I) -> Self {
        let mut pool = Self::new();
        for server in iter {
            pool.insert(server);
        }
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_iterates_in_id_order() {
        let pool: CandidatePool = ["room-3", "room-1", "room-2"]
            .into_iter()
            .map(|id| ServerDescriptor::new(id, "room", "127.0.0.1:0"))
            .collect();

        let ids: Vec<_> = pool.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["room-1", "room-2", "room-3"]);
        assert_eq!(pool.first().unwrap().id, "room-1");
        assert_eq!(pool.nth(2).unwrap().id, "room-3");
        assert!(pool.nth(3).is_none());
    }

    #[test]
    fn insert_replaces_same_id() {
        let mut pool = CandidatePool::new();
        pool.insert(ServerDescriptor::new("room-1", "room", "10.0.0.1:1"));
        pool.insert(ServerDescriptor::new("room-1", "room", "10.0.0.2:1"));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get("room-1").unwrap().address, "10.0.0.2:1");
    }
}
