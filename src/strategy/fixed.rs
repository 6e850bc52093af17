//! Always route to one configured server.

use crate::cluster::{CandidatePool, ServerDescriptor};
use crate::strategy::{RouteContext, RouteStrategy};

/// Picks a fixed server id; no decision when that server is not in the pool.
#[derive(Debug, Clone)]
pub struct FixedPick {
    server_id: String,
}

impl FixedPick {
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
        }
    }
}

impl RouteStrategy for FixedPick {
    fn select<'p>(
        &self,
        _ctx: &RouteContext<'_>,
        pool: &'p CandidatePool,
    ) -> Option<&'p ServerDescriptor> {
        pool.get(&self.server_id)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
