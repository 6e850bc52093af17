//! Cluster collaborators consumed by the router.
//!
//! # Data Flow
//! ```text
//! Remote route "room.join"
//!     → discovery.rs (servers_of_type("room") → CandidatePool snapshot)
//!     → strategy registry picks one ServerDescriptor
//!     → forward.rs (deliver request to the chosen server)
//! ```
//!
//! # Design Decisions
//! - Membership is owned elsewhere; the router only reads per-request snapshots
//! - Pools are id-ordered so every iteration is deterministic

pub mod discovery;
pub mod forward;
pub mod server;

pub use discovery::{ServerDiscovery, StaticDiscovery};
pub use forward::{ForwardError, Forwarder, TcpForwarder};
pub use server::{CandidatePool, ServerDescriptor};
