//! Uniform random selection.

use crate::cluster::{CandidatePool, ServerDescriptor};
use crate::strategy::{RouteContext, RouteStrategy};

#[derive(Debug, Default, Clone, Copy)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl RouteStrategy for Random {
    fn select<'p>(
        &self,
        _ctx: &RouteContext<'_>,
        pool: &'p CandidatePool,
    ) -> Option<&'p ServerDescriptor> {
        if pool.is_empty() {
            return None;
        }
        pool.nth(fastrand::usize(..pool.len()))
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
