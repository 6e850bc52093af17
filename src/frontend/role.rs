//! Cluster role declared by a node at startup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::FrontendConfig;

/// Whether this node faces clients, and which server type it serves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerRole {
    pub frontend: bool,
    pub server_type: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ServerRole {
    /// A client-facing node.
    pub fn frontend(server_type: impl Into<String>) -> Self {
        Self {
            frontend: true,
            server_type: server_type.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// A node reachable only through the cluster.
    pub fn backend(server_type: impl Into<String>) -> Self {
        Self {
            frontend: false,
            ..Self::frontend(server_type)
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_frontend(&self) -> bool {
        self.frontend
    }

    pub fn from_config(config: &FrontendConfig) -> Self {
        Self {
            frontend: config.frontend,
            server_type: config.server_type.clone(),
            metadata: config.metadata.clone(),
        }
    }
}
