//! Round-robin selection strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cluster::{CandidatePool, ServerDescriptor};
use crate::strategy::{RouteContext, RouteStrategy};

/// Round-robin selector.
/// Stores an internal counter to rotate through candidates in id order.
/// The counter is shared by every request of the service, so rotation is global,
/// not per session.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RouteStrategy for RoundRobin {
    fn select<'p>(
        &self,
        _ctx: &RouteContext<'_>,
        pool: &'p CandidatePool,
    ) -> Option<&'p ServerDescriptor> {
        if pool.is_empty() {
            return None;
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % pool.len();
        pool.nth(index)
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
