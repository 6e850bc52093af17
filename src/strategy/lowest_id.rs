//! Default policy: the candidate with the lowest server id.

use crate::cluster::{CandidatePool, ServerDescriptor};
use crate::strategy::{RouteContext, RouteStrategy};

/// Deterministic given the same pool: ids compare byte-wise.
#[derive(Debug, Default, Clone, Copy)]
pub struct LowestId;

impl RouteStrategy for LowestId {
    fn select<'p>(
        &self,
        _ctx: &RouteContext<'_>,
        pool: &'p CandidatePool,
    ) -> Option<&'p ServerDescriptor> {
        pool.first()
    }

    fn name(&self) -> &'static str {
        "lowest_id"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{pool, route, session};

    #[test]
    fn byte_wise_order() {
        let pool = pool(&["room-10", "room-9", "room-2"]);
        let session = session();
        let route = route("room.join");
        let ctx = RouteContext::new(&session, &route, b"");

        // "room-10" < "room-2" < "room-9"
        assert_eq!(LowestId.select(&ctx, &pool).unwrap().id, "room-10");
    }
}
