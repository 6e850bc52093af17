//! Per-service server selection.
//!
//! # Data Flow
//! ```text
//! Remote request (route.service = "room")
//!     → registry.rs (look up strategy bound to "room")
//!     → Apply strategy to the CandidatePool snapshot:
//!         - fixed.rs (always the configured server id)
//!         - round_robin.rs (rotate through id-ordered candidates)
//!         - random.rs (uniform pick)
//!         - lowest_id.rs (default policy)
//!         - custom.rs (user-supplied closure)
//!     → One ServerDescriptor, or NoServerAvailable
//! ```
//!
//! # Design Decisions
//! - One strategy per service; no overriding or stacking
//! - Strategies see the session and pool through shared references only
//! - Registry is built during bootstrap and read-only afterwards
//! - "No decision" falls back to the lowest server id, never to map iteration order

pub mod custom;
pub mod fixed;
pub mod lowest_id;
pub mod random;
pub mod registry;
pub mod round_robin;

use serde::{Deserialize, Serialize};

use crate::cluster::{CandidatePool, ServerDescriptor};
use crate::routing::Route;
use crate::session::Session;

pub use custom::FnStrategy;
pub use fixed::FixedPick;
pub use lowest_id::LowestId;
pub use random::Random;
pub use registry::{RoutingError, StrategyRegistry};
pub use round_robin::RoundRobin;

/// Read-only view of the request being routed.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    pub session: &'a Session,
    pub route: &'a Route,
    pub payload: &'a [u8],
}

impl<'a> RouteContext<'a> {
    pub fn new(session: &'a Session, route: &'a Route, payload: &'a [u8]) -> Self {
        Self {
            session,
            route,
            payload,
        }
    }
}

/// Selects one server from a non-empty candidate pool.
///
/// Returning `None` means "no decision": the registry applies the default policy.
/// Implementations must not block.
pub trait RouteStrategy: Send + Sync + std::fmt::Debug {
    fn select<'p>(
        &self,
        ctx: &RouteContext<'_>,
        pool: &'p CandidatePool,
    ) -> Option<&'p ServerDescriptor>;

    /// Strategy name for logging.
    fn name(&self) -> &'static str;
}

/// Strategy selector as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyKind {
    Fixed { server_id: String },
    RoundRobin,
    Random,
    LowestId,
}

impl StrategyKind {
    pub fn build(&self) -> Box<dyn RouteStrategy> {
        match self {
            StrategyKind::Fixed { server_id } => Box::new(FixedPick::new(server_id.clone())),
            StrategyKind::RoundRobin => Box::new(RoundRobin::new()),
            StrategyKind::Random => Box::new(Random::new()),
            StrategyKind::LowestId => Box::new(LowestId),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::net::connection::ConnectionId;

    pub fn pool(ids: &[&str]) -> CandidatePool {
        ids.iter()
            .map(|id| ServerDescriptor::new(*id, "room", format!("10.0.0.1:{}", 4000 + id.len())))
            .collect()
    }

    pub fn session() -> Session {
        Session::new(ConnectionId::new(), "127.0.0.1:5000".parse().unwrap())
    }

    pub fn route(name: &str) -> Route {
        Route::parse(name).unwrap()
    }
}
