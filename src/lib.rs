//! Cluster frontend: client acceptors and request routing for a clustered
//! real-time server.

pub mod cluster;
pub mod config;
pub mod frontend;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod routing;
pub mod session;
pub mod strategy;

pub use config::schema::FrontendConfig;
pub use frontend::{BootstrapError, Frontend, FrontendBuilder, ServerRole};
pub use lifecycle::Shutdown;
pub use routing::{Route, RouteDictionary};
pub use session::Session;
pub use strategy::{RouteStrategy, StrategyRegistry};
