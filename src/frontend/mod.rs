//! Frontend subsystem: composes dictionary, strategies, handlers and acceptors
//! into one running node.
//!
//! # Data Flow
//! ```text
//! FrontendBuilder::start()
//!     → register strategies → define dictionary → seal
//!     → validate role → bind acceptors (all-or-nothing) → declare role
//!     → Frontend::run()
//!
//! Per connection (handler.rs, one task each):
//!     frame → decode envelope → FrontendContext::dispatch
//!         → local route:  LocalHandler (local.rs, connector.rs)
//!         → remote route: discovery → strategy registry → forwarder
//!     → response frame
//! ```
//!
//! # Design Decisions
//! - Everything mutable during bootstrap is frozen into one `FrontendContext`
//! - Routing failures answer the client with a retryable error; the connection stays open
//! - Transport failures end only the affected connection

pub mod bootstrap;
pub mod connector;
pub mod context;
pub mod handler;
pub mod local;
pub mod role;

pub use bootstrap::{BootstrapError, Frontend, FrontendBuilder};
pub use connector::{GetSessionData, SetSessionData};
pub use context::{DispatchError, FrontendContext};
pub use local::{HandlerError, HandlerExists, HandlerRegistry, LocalHandler};
pub use role::ServerRole;
