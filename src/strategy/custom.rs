//! User-supplied selection closures.

use std::fmt;

use crate::cluster::{CandidatePool, ServerDescriptor};
use crate::strategy::{RouteContext, RouteStrategy};

/// Wraps a closure that returns the id of the server to use.
///
/// The closure only sees shared references and answers with an id, which is
/// then looked up in the pool; it cannot hand back a server outside the pool.
pub struct FnStrategy<F> {
    name: &'static str,
    f: F,
}

impl<F> FnStrategy<F>
where
    F: Fn(&RouteContext<'_>, &CandidatePool) -> Option<String> + Send + Sync,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> fmt::Debug for FnStrategy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStrategy").field("name", &self.name).finish()
    }
}

impl<F> RouteStrategy for FnStrategy<F>
where
    F: Fn(&RouteContext<'_>, &CandidatePool) -> Option<String> + Send + Sync,
{
    fn select<'p>(
        &self,
        ctx: &RouteContext<'_>,
        pool: &'p CandidatePool,
    ) -> Option<&'p ServerDescriptor> {
        (self.f)(ctx, pool).and_then(|id| pool.get(&id))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{pool, route, session};

    #[test]
    fn routes_by_payload() {
        let strategy = FnStrategy::new("by_payload", |ctx: &RouteContext<'_>, _pool: &CandidatePool| {
            std::str::from_utf8(ctx.payload).ok().map(str::to_string)
        });
        let pool = pool(&["room-1", "room-2"]);
        let session = session();
        let route = route("room.join");

        let ctx = RouteContext::new(&session, &route, b"room-2");
        assert_eq!(strategy.select(&ctx, &pool).unwrap().id, "room-2");

        let ctx = RouteContext::new(&session, &route, b"room-7");
        assert!(strategy.select(&ctx, &pool).is_none());
        assert_eq!(strategy.name(), "by_payload");
    }
}
