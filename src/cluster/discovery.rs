//! Cluster membership lookups.

use std::collections::BTreeMap;

use crate::cluster::server::{CandidatePool, ServerDescriptor};

/// Supplies the currently known live servers of a type.
///
/// Implementations may lag real membership. Lookups must not block on I/O;
/// anything remote has to be resolved into memory before the call.
pub trait ServerDiscovery: Send + Sync + std::fmt::Debug {
    fn servers_of_type(&self, server_type: &str) -> CandidatePool;
}

/// Fixed membership, typically loaded from the `[[servers]]` config list.
#[derive(Debug, Default, Clone)]
pub struct StaticDiscovery {
    by_type: BTreeMap<String, Vec<ServerDescriptor>>,
}

impl StaticDiscovery {
    pub fn new(servers: impl IntoIterator<Item = ServerDescriptor>) -> Self {
        let mut by_type: BTreeMap<String, Vec<ServerDescriptor>> = BTreeMap::new();
        for server in servers {
            by_type
                .entry(server.server_type.clone())
                .or_default()
                .push(server);
        }
        Self { by_type }
    }

    /// Number of known servers across all types.
    pub fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl ServerDiscovery for StaticDiscovery {
    fn servers_of_type(&self, server_type: &str) -> CandidatePool {
        self.by_type
            .get(server_type)
            .map(|servers| servers.iter().cloned().collect())
            .unwrap_or_default()
    }
}
